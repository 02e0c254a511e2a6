// src/engine/orchestrator.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::builder::paths::BUILD_ROOT;
use crate::builder::{self, BuildEnv, Builder};
use crate::config::BuildOptions;
use crate::engine::session::WatchSession;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::livereload::{self, LiveReload};
use crate::manifest::{load_manifest, Manifest};
use crate::task::{CancelToken, TaskBatch};
use crate::tools::Toolchain;
use crate::types::{BuildMode, BuilderKind};
use crate::watch::{NotifyBackend, WatchBackend};

/// Result of one [`Orchestrator::run`].
#[derive(Debug)]
pub struct RunOutcome {
    pub mode: BuildMode,
    pub module_path: PathBuf,
    /// Number of builders instantiated from the manifest.
    pub builders: usize,
    /// Task names in the order they settled.
    pub completed: Vec<String>,
    /// Present in watch mode when at least one watch was set up.
    pub session: Option<WatchSession>,
}

impl RunOutcome {
    fn noop(mode: BuildMode, module_path: PathBuf) -> Self {
        Self {
            mode,
            module_path,
            builders: 0,
            completed: Vec::new(),
            session: None,
        }
    }
}

/// Loads a module's manifest, instantiates its builders and settles the
/// resulting task batch.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    options: BuildOptions,
    toolchain: Toolchain,
    watch_backend: Arc<dyn WatchBackend>,
    fs: Arc<dyn FileSystem>,
    livereload: LiveReload,
}

impl Orchestrator {
    /// Orchestrator backed by external tool processes, `notify` and the real
    /// filesystem.
    pub fn new(options: BuildOptions) -> Self {
        Self {
            toolchain: Toolchain::from_options(&options.tools),
            options,
            watch_backend: Arc::new(NotifyBackend),
            fs: Arc::new(RealFileSystem),
            livereload: LiveReload::new(),
        }
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn with_watch_backend(mut self, backend: Arc<dyn WatchBackend>) -> Self {
        self.watch_backend = backend;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// The process-wide broadcast every builder publishes to.
    pub fn livereload(&self) -> &LiveReload {
        &self.livereload
    }

    fn env(&self, cancel: CancelToken) -> Arc<BuildEnv> {
        Arc::new(BuildEnv {
            options: self.options.clone(),
            toolchain: self.toolchain.clone(),
            livereload: self.livereload.clone(),
            watch_backend: Arc::clone(&self.watch_backend),
            fs: Arc::clone(&self.fs),
            cancel,
        })
    }

    /// Read the module's manifest. `None` when it declares no build block.
    pub fn load(&self, module_path: &Path) -> Result<Option<Manifest>> {
        load_manifest(self.fs.as_ref(), module_path)
    }

    /// One builder per declared descriptor, kinds in [`BuilderKind::ALL`]
    /// order.
    pub fn resolve_builders(
        &self,
        module_path: &Path,
        manifest: &Manifest,
    ) -> Result<Vec<Box<dyn Builder>>> {
        self.resolve_in(self.env(CancelToken::new()), module_path, manifest)
    }

    fn resolve_in(
        &self,
        env: Arc<BuildEnv>,
        module_path: &Path,
        manifest: &Manifest,
    ) -> Result<Vec<Box<dyn Builder>>> {
        let mut builders = Vec::with_capacity(manifest.target_count());
        for kind in BuilderKind::ALL {
            let targets = manifest.targets_for(kind);
            if targets.is_empty() {
                debug!(kind = %kind, "no targets for builder kind");
                continue;
            }
            for descriptor in targets {
                let builder = builder::instantiate(
                    kind,
                    Arc::clone(&env),
                    module_path,
                    &manifest.name,
                    descriptor.clone(),
                )?;
                debug!(builder = %builder.label(), "builder resolved");
                builders.push(builder);
            }
        }
        Ok(builders)
    }

    /// Run `mode` on every builder of the module and settle the batch.
    ///
    /// In watch mode this returns once every watch is set up; the returned
    /// [`WatchSession`] keeps them running until stopped.
    pub async fn run(&self, module_path: &Path, mode: BuildMode) -> Result<RunOutcome> {
        let module_path = std::path::absolute(module_path)?;

        let Some(manifest) = self.load(&module_path)? else {
            return Ok(RunOutcome::noop(mode, module_path));
        };

        if mode == BuildMode::Compile {
            self.fs.create_dir_all(&module_path.join(BUILD_ROOT))?;
        }

        let cancel = CancelToken::new();
        let builders = self.resolve_in(self.env(cancel.clone()), &module_path, &manifest)?;

        let mut batch = TaskBatch::new(cancel.clone());
        for builder in &builders {
            match mode {
                BuildMode::Compile => builder.compile(&mut batch),
                BuildMode::Watch => builder.watch(&mut batch),
            }
        }
        info!(
            module = %manifest.name,
            mode = %mode,
            builders = builders.len(),
            tasks = batch.len(),
            "running tasks"
        );

        let server = if mode == BuildMode::Watch
            && self.options.livereload.enabled
            && !batch.is_empty()
        {
            let lr = &self.options.livereload;
            Some(livereload::serve(self.livereload.clone(), &lr.host, lr.port, cancel.clone()).await?)
        } else {
            None
        };

        let report = match batch.settle().await {
            Ok(report) => report,
            Err(err) => {
                if mode == BuildMode::Watch {
                    // A half-started session is torn down as a whole.
                    WatchSession::new(cancel, server).stop().await;
                }
                return Err(err);
            }
        };

        let session = match mode {
            BuildMode::Watch if !report.completed.is_empty() => {
                Some(WatchSession::new(cancel, server))
            }
            BuildMode::Watch => {
                warn!("no watch tasks; nothing to keep running");
                None
            }
            BuildMode::Compile => None,
        };

        info!(tasks = report.completed.len(), "all tasks settled");
        Ok(RunOutcome {
            mode,
            module_path,
            builders: builders.len(),
            completed: report.completed,
            session,
        })
    }
}
