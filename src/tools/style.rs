// src/tools/style.rs

use std::path::PathBuf;

use crate::config::ToolCommand;
use crate::errors::Result;
use crate::tools::process::{run_tool, ToolInvocation};
use crate::tools::ToolFuture;

/// One stylesheet entry point to preprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRequest {
    pub entry: PathBuf,
    /// Directories searched for `@import`s.
    pub include_paths: Vec<PathBuf>,
    pub compress: bool,
    pub sourcemap: bool,
}

/// Style preprocessor seam: stylesheet source in, CSS out.
pub trait StyleCompiler: Send + Sync + std::fmt::Debug {
    fn compile(&self, request: StyleRequest) -> ToolFuture<'_, String>;
}

/// Runs the `stylus` CLI in stdin/stdout mode.
#[derive(Debug, Clone)]
pub struct StylusCommand {
    tool: ToolCommand,
}

impl StylusCommand {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }

    async fn compile_inner(&self, request: StyleRequest) -> Result<String> {
        let source = tokio::fs::read_to_string(&request.entry).await?;

        let mut args = Vec::new();
        for dir in &request.include_paths {
            args.push("--include".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }
        if request.compress {
            args.push("--compress".to_string());
        }
        if request.sourcemap {
            args.push("--sourcemap-inline".to_string());
        }

        run_tool(
            &self.tool,
            ToolInvocation {
                args,
                stdin: Some(source),
                cwd: request.entry.parent(),
                env: Vec::new(),
            },
        )
        .await
    }
}

impl StyleCompiler for StylusCommand {
    fn compile(&self, request: StyleRequest) -> ToolFuture<'_, String> {
        Box::pin(self.compile_inner(request))
    }
}
