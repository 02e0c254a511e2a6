// src/tools/install.rs

use std::path::PathBuf;

use crate::config::ToolCommand;
use crate::tools::process::{run_tool, ToolInvocation};
use crate::tools::ToolFuture;

/// Dependency installer seam (`bower install`).
pub trait PackageInstaller: Send + Sync + std::fmt::Debug {
    /// Install the dependencies declared in `dir`.
    fn install(&self, dir: PathBuf) -> ToolFuture<'_, ()>;
}

#[derive(Debug, Clone)]
pub struct InstallCommand {
    tool: ToolCommand,
}

impl InstallCommand {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }
}

impl PackageInstaller for InstallCommand {
    fn install(&self, dir: PathBuf) -> ToolFuture<'_, ()> {
        Box::pin(async move {
            run_tool(
                &self.tool,
                ToolInvocation {
                    cwd: Some(&dir),
                    ..Default::default()
                },
            )
            .await?;
            Ok(())
        })
    }
}
