// src/builder/mod.rs

//! Builders turn one build target of a module into task handles.
//!
//! A builder never awaits its own work: `compile` and `watch` only push
//! handles onto the shared [`TaskBatch`]; the orchestrator settles it.

use std::fmt;
use std::sync::Arc;

use crate::config::BuildOptions;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::livereload::LiveReload;
use crate::manifest::TargetDescriptor;
use crate::task::{CancelToken, TaskBatch};
use crate::tools::Toolchain;
use crate::types::BuilderKind;
use crate::watch::WatchBackend;

pub mod bower;
pub mod copy;
pub mod generic;
pub mod html;
pub mod jsio;
pub mod paths;
pub mod resolve;

pub use generic::GenericBuilder;
pub use jsio::JsioBuilder;
pub use paths::BuilderPaths;

/// Everything a builder needs from the outside world for one run.
pub struct BuildEnv {
    pub options: BuildOptions,
    pub toolchain: Toolchain,
    pub livereload: LiveReload,
    pub watch_backend: Arc<dyn WatchBackend>,
    pub fs: Arc<dyn FileSystem>,
    /// Stops watch sessions and in-flight work of this run.
    pub cancel: CancelToken,
}

impl fmt::Debug for BuildEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildEnv")
            .field("options", &self.options)
            .field("watch_backend", &self.watch_backend)
            .finish_non_exhaustive()
    }
}

/// Common contract of every builder kind.
pub trait Builder: Send + Sync + fmt::Debug {
    fn kind(&self) -> BuilderKind;

    fn paths(&self) -> &BuilderPaths;

    /// Log label: `<Kind>Builder.<module>.<src>`.
    fn label(&self) -> String {
        builder_label(self.kind(), self.paths())
    }

    /// Push the one-shot build pipeline.
    fn compile(&self, tasks: &mut TaskBatch);

    /// Push exactly one handle that resolves once the watch session is set up.
    fn watch(&self, tasks: &mut TaskBatch);
}

pub fn builder_label(kind: BuilderKind, paths: &BuilderPaths) -> String {
    format!("{}.{}.{}", kind.log_prefix(), paths.module_name(), paths.src())
}

/// Construct the builder for `kind` from one manifest descriptor.
pub fn instantiate(
    kind: BuilderKind,
    env: Arc<BuildEnv>,
    module_root: &std::path::Path,
    module_name: &str,
    descriptor: TargetDescriptor,
) -> Result<Box<dyn Builder>> {
    let paths = BuilderPaths::new(env.fs.as_ref(), module_root, module_name, descriptor)?;
    Ok(match kind {
        BuilderKind::Jsio => Box::new(JsioBuilder::new(env, paths)?),
        BuilderKind::Generic => Box::new(GenericBuilder::new(env, paths)),
    })
}
