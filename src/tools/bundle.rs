// src/tools/bundle.rs

use std::path::PathBuf;

use crate::config::ToolCommand;
use crate::errors::{BuildError, Result};
use crate::tools::process::{run_tool, ToolInvocation};
use crate::tools::ToolFuture;

/// Entry-point based dependency-graph bundling request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    pub entry: PathBuf,
    pub module_root: PathBuf,
    /// Extra module resolution roots (`NODE_PATH`).
    pub node_paths: Vec<PathBuf>,
    /// Watch mode bundles carry inline source maps.
    pub debug: bool,
}

/// Script bundler seam: entry point in, single bundle out.
pub trait ScriptBundler: Send + Sync + std::fmt::Debug {
    fn bundle(&self, request: BundleRequest) -> ToolFuture<'_, String>;
}

/// Runs a browserify-compatible CLI that prints the bundle to stdout.
#[derive(Debug, Clone)]
pub struct BrowserifyCommand {
    tool: ToolCommand,
}

impl BrowserifyCommand {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }

    async fn bundle_inner(&self, request: BundleRequest) -> Result<String> {
        let mut args = vec![request.entry.to_string_lossy().into_owned()];
        if request.debug {
            args.push("--debug".to_string());
        }

        let mut env = Vec::new();
        if !request.node_paths.is_empty() {
            let joined = std::env::join_paths(&request.node_paths)
                .map_err(|e| BuildError::Config(format!("invalid NODE_PATH entry: {e}")))?;
            env.push(("NODE_PATH".to_string(), joined.to_string_lossy().into_owned()));
        }

        run_tool(
            &self.tool,
            ToolInvocation {
                args,
                stdin: None,
                cwd: Some(&request.module_root),
                env,
            },
        )
        .await
    }
}

impl ScriptBundler for BrowserifyCommand {
    fn bundle(&self, request: BundleRequest) -> ToolFuture<'_, String> {
        Box::pin(self.bundle_inner(request))
    }
}
