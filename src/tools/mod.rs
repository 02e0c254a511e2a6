// src/tools/mod.rs

//! External collaborators: style preprocessor, bundler, minifier, dependency
//! installer and the script compiler service.
//!
//! Each is a trait so tests can swap in fakes; the real implementations
//! shell out through [`process::run_tool`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ToolsSection;
use crate::errors::Result;

pub mod bundle;
pub mod compiler;
pub mod install;
pub mod minify;
pub mod process;
pub mod style;

pub use bundle::{BrowserifyCommand, BundleRequest, ScriptBundler};
pub use compiler::{
    CompileMeta, CompileRequest, CompilerHandle, CompilerInterface, CompilerService,
    ProcessCompilerService,
};
pub use install::{InstallCommand, PackageInstaller};
pub use minify::{Minifier, MinifyRequest, UglifyCommand};
pub use process::{run_tool, ToolInvocation};
pub use style::{StyleCompiler, StyleRequest, StylusCommand};

/// Boxed future returned by every tool trait method.
pub type ToolFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The full set of collaborators a build needs.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub style: Arc<dyn StyleCompiler>,
    pub bundler: Arc<dyn ScriptBundler>,
    pub minifier: Arc<dyn Minifier>,
    pub installer: Arc<dyn PackageInstaller>,
    pub compiler: Arc<dyn CompilerService>,
}

impl Toolchain {
    /// Process-backed toolchain using the configured commands.
    pub fn from_options(tools: &ToolsSection) -> Self {
        Self {
            style: Arc::new(StylusCommand::new(tools.stylus.clone())),
            bundler: Arc::new(BrowserifyCommand::new(tools.bundler.clone())),
            minifier: Arc::new(UglifyCommand::new(tools.minifier.clone())),
            installer: Arc::new(InstallCommand::new(tools.installer.clone())),
            compiler: Arc::new(ProcessCompilerService::new(tools.compiler.clone())),
        }
    }
}
