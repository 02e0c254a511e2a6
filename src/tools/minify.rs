// src/tools/minify.rs

use crate::config::ToolCommand;
use crate::errors::Result;
use crate::tools::process::{run_tool, ToolInvocation};
use crate::tools::ToolFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifyRequest {
    /// File name the source belongs to, for diagnostics only.
    pub name: String,
    pub source: String,
    /// Global constant definitions (`DEBUG=false`).
    pub defines: Vec<(String, String)>,
}

impl MinifyRequest {
    pub fn new(name: impl Into<String>, source: String) -> Self {
        Self {
            name: name.into(),
            source,
            defines: Vec::new(),
        }
    }

    pub fn define(mut self, key: &str, value: &str) -> Self {
        self.defines.push((key.to_string(), value.to_string()));
        self
    }
}

/// Minifier seam.
pub trait Minifier: Send + Sync + std::fmt::Debug {
    fn minify(&self, request: MinifyRequest) -> ToolFuture<'_, String>;
}

/// Runs an uglify-compatible CLI in stdin/stdout mode.
#[derive(Debug, Clone)]
pub struct UglifyCommand {
    tool: ToolCommand,
}

impl UglifyCommand {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }

    async fn minify_inner(&self, request: MinifyRequest) -> Result<String> {
        let mut args = Vec::new();
        for (key, value) in &request.defines {
            args.push("--define".to_string());
            args.push(format!("{key}={value}"));
        }
        tracing::debug!(name = %request.name, bytes = request.source.len(), "minifying");

        run_tool(
            &self.tool,
            ToolInvocation {
                args,
                stdin: Some(request.source),
                cwd: None,
                env: Vec::new(),
            },
        )
        .await
    }
}

impl Minifier for UglifyCommand {
    fn minify(&self, request: MinifyRequest) -> ToolFuture<'_, String> {
        Box::pin(self.minify_inner(request))
    }
}
