// src/builder/jsio.rs

//! Script/module builder driven by the jsio compiler service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::builder::resolve::{PeerResolver, ResolveScope};
use crate::builder::{builder_label, BuildEnv, Builder, BuilderPaths};
use crate::engine::{RebuildFactory, WatchQueue};
use crate::errors::{BuildError, Result};
use crate::fs::run_blocking;
use crate::task::{run_as_task, TaskBatch, TaskHandle, TaskOutput};
use crate::tools::{
    CompileMeta, CompileRequest, CompilerHandle, CompilerInterface, Minifier, MinifyRequest,
    StyleRequest, ToolFuture,
};
use crate::types::BuilderKind;
use crate::watch::{rooted_pattern, TriggerFired, TriggerProfile};

pub const TRIGGER_STYLUS: &str = "stylus";
pub const TRIGGER_JS: &str = "js";

const TRIGGER_BUFFER: usize = 64;

/// Resolved peer library locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsioPeers {
    pub jsio: PathBuf,
    /// Widget library; only looked up next to the module.
    pub squill: Option<PathBuf>,
}

impl JsioPeers {
    /// Resolve the peers for a module. Missing jsio is a configuration error.
    pub fn resolve(env: &BuildEnv, resolver: &PeerResolver) -> Result<Self> {
        let fs = env.fs.as_ref();
        let squill = resolver.resolve(fs, "squill", Some("Widget.js"), ResolveScope::ModuleOnly);
        let jsio = resolver
            .resolve(fs, "jsio", None, ResolveScope::Anywhere)
            .ok_or_else(|| {
                BuildError::Config(
                    "jsio is not installed next to the module, on NODE_PATH or in any configured global path"
                        .to_string(),
                )
            })?;
        Ok(Self { jsio, squill })
    }
}

#[derive(Debug)]
pub struct JsioBuilder {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    env: Arc<BuildEnv>,
    paths: BuilderPaths,
    label: String,
    stylus_main: PathBuf,
    peers: JsioPeers,
}

impl JsioBuilder {
    pub fn new(env: Arc<BuildEnv>, paths: BuilderPaths) -> Result<Self> {
        let resolver = PeerResolver::from_env(
            paths.module_root(),
            env.options.resolve.global_paths.clone(),
        );
        Self::with_resolver(env, paths, &resolver)
    }

    pub fn with_resolver(
        env: Arc<BuildEnv>,
        paths: BuilderPaths,
        resolver: &PeerResolver,
    ) -> Result<Self> {
        let label = builder_label(BuilderKind::Jsio, &paths);
        let peers = JsioPeers::resolve(&env, resolver)?;
        debug!(builder = %label, jsio = ?peers.jsio, squill = ?peers.squill, "resolved peers");
        if peers.squill.is_none() {
            debug!(builder = %label, "squill not found in module");
        }

        Ok(Self {
            shared: Arc::new(Shared {
                stylus_main: paths.src_dir().join("stylus").join("main.styl"),
                env,
                paths,
                label,
                peers,
            }),
        })
    }

    pub fn peers(&self) -> &JsioPeers {
        &self.shared.peers
    }

    /// Start request for this target's compile.
    pub fn compile_request(&self) -> CompileRequest {
        self.shared.compile_request()
    }
}

impl Builder for JsioBuilder {
    fn kind(&self) -> BuilderKind {
        BuilderKind::Jsio
    }

    fn paths(&self) -> &BuilderPaths {
        &self.shared.paths
    }

    fn label(&self) -> String {
        self.shared.label.clone()
    }

    fn compile(&self, tasks: &mut TaskBatch) {
        let s = &self.shared;
        if s.env.fs.exists(&s.stylus_main) {
            tasks.push(s.build_stylus());
        }
        tasks.push(s.build_js());
    }

    fn watch(&self, tasks: &mut TaskBatch) {
        let s = Arc::clone(&self.shared);
        tasks.push(run_as_task(&self.shared.label, "watch", move || {
            TaskOutput::future(s.start_watch())
        }));
    }
}

impl Shared {
    fn build_stylus(self: &Arc<Self>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "buildStylus", move || {
            TaskOutput::future(async move {
                info!(builder = %this.label, "Compiling stylus for {}: {:?}", this.paths.module_name(), this.stylus_main);
                let stylus_dir = this.stylus_main.parent().map(Path::to_path_buf).unwrap_or_default();
                let request = StyleRequest {
                    entry: this.stylus_main.clone(),
                    include_paths: vec![stylus_dir],
                    compress: false,
                    sourcemap: false,
                };
                let css = this.env.toolchain.style.compile(request).await?;
                let out = this.paths.build_dir().join("index.css");
                write_file(&this.env, out.clone(), css).await?;
                this.env.livereload.notify(out.to_string_lossy());
                Ok(())
            })
        })
    }

    fn build_js(self: &Arc<Self>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "buildJS", move || {
            TaskOutput::future(this.compile_js())
        })
    }

    fn compile_request(&self) -> CompileRequest {
        let js_path = self.paths.src_dir();
        let base = js_path.parent().unwrap_or(js_path).to_path_buf();

        let mut path_cache = BTreeMap::new();
        path_cache.insert("jsio".to_string(), self.peers.jsio.clone());
        path_cache.insert("src".to_string(), base.clone());
        if let Some(squill) = &self.peers.squill {
            path_cache.insert("squill".to_string(), squill.clone());
        }

        CompileRequest {
            args: vec![
                "jsio_compile".to_string(),
                js_path.to_string_lossy().into_owned(),
                format!("import src.{}", self.paths.descriptor().main_module()),
            ],
            cwd: base,
            environment: "browser".to_string(),
            path: vec![self.peers.jsio.clone()],
            include_jsio: false,
            append_import: true,
            compress_sources: false,
            compress_result: false,
            path_cache,
        }
    }

    async fn compile_js(self: Arc<Self>) -> Result<()> {
        info!(
            builder = %self.label,
            "Compiling jsMain for {}: {}",
            self.paths.module_name(),
            self.paths.src()
        );
        debug!(builder = %self.label, jsio = ?self.peers.jsio, js_path = ?self.paths.src_dir(), "compile inputs");

        let (tx, rx) = oneshot::channel();
        let session = Arc::new(JsioSession {
            label: self.label.clone(),
            minifier: Arc::clone(&self.env.toolchain.minifier),
            compiler: Mutex::new(None),
            result: Mutex::new(Some(tx)),
        });
        self.env
            .toolchain
            .compiler
            .start(self.compile_request(), session);

        let (_meta, code) = rx.await.map_err(|_| {
            BuildError::ContractViolation(
                "compiler service dropped the request without calling on_error or on_finish"
                    .to_string(),
            )
        })??;

        let out = self.paths.build_dir().join(self.paths.descriptor().output_name());
        write_file(&self.env, out.clone(), wrap_module(&code)).await?;
        self.env.livereload.notify(out.to_string_lossy());
        Ok(())
    }

    fn trigger_profiles(&self) -> Result<Vec<TriggerProfile>> {
        let src = Path::new(self.paths.src());
        Ok(vec![
            TriggerProfile::new(TRIGGER_STYLUS, &[rooted_pattern(src, "stylus/**/*.styl")], &[])?,
            TriggerProfile::new(TRIGGER_JS, &[rooted_pattern(src, "**/*.js")], &[])?,
        ])
    }

    fn route(self: &Arc<Self>, fired: &TriggerFired) -> Option<RebuildFactory> {
        let this = Arc::clone(self);
        let factory: RebuildFactory = match fired.trigger.as_str() {
            TRIGGER_STYLUS => {
                info!(builder = %self.label, "stylus changed");
                Box::new(move || this.build_stylus())
            }
            TRIGGER_JS => {
                info!(builder = %self.label, "js changed");
                Box::new(move || this.build_js())
            }
            _ => return None,
        };
        Some(factory)
    }

    async fn start_watch(self: Arc<Self>) -> Result<()> {
        let (tx, rx) = mpsc::channel(TRIGGER_BUFFER);
        let guard = self
            .env
            .watch_backend
            .watch(self.paths.module_root(), self.trigger_profiles()?, tx)?;

        let queue = WatchQueue::new(self.label.clone(), self.env.cancel.clone());
        let router = Arc::clone(&self);
        queue.spawn_dispatcher(rx, guard, move |fired| router.route(fired));
        info!(builder = %self.label, "watching");
        Ok(())
    }
}

/// Runtime-bootstrap envelope around compiled code.
pub fn wrap_module(code: &str) -> String {
    format!(";(function(jsio){{{code}}})(jsio.clone());")
}

async fn write_file(env: &BuildEnv, path: PathBuf, contents: String) -> Result<()> {
    run_blocking(Arc::clone(&env.fs), move |fs| {
        if let Some(dir) = path.parent() {
            fs.create_dir_all(dir)?;
        }
        fs.write(&path, contents.as_bytes())?;
        Ok(())
    })
    .await
}

type CompileOutcome = Result<(CompileMeta, String)>;

/// Callback table for one compile request. Settles at most once.
struct JsioSession {
    label: String,
    minifier: Arc<dyn Minifier>,
    compiler: Mutex<Option<Arc<dyn CompilerHandle>>>,
    result: Mutex<Option<oneshot::Sender<CompileOutcome>>>,
}

impl JsioSession {
    fn settle(&self, outcome: CompileOutcome) {
        let sender = self
            .result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => warn!(builder = %self.label, "compiler settled twice; ignoring"),
        }
    }

    fn compiler(&self) -> MutexGuard<'_, Option<Arc<dyn CompilerHandle>>> {
        self.compiler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CompilerInterface for JsioSession {
    fn set_compiler(&self, compiler: Arc<dyn CompilerHandle>) {
        *self.compiler() = Some(compiler);
    }

    fn run(&self, args: Vec<String>, opts: Value) {
        let Some(compiler) = self.compiler().clone() else {
            warn!(builder = %self.label, "compiler run requested before set_compiler");
            return;
        };
        let label = self.label.clone();
        tokio::spawn(async move {
            if let Err(err) = compiler.run(args, opts).await {
                warn!(builder = %label, error = %err, "follow-up compile failed");
            }
        });
    }

    fn on_error(&self, err: BuildError) {
        error!(builder = %self.label, error = %err, "Error while compiling");
        self.settle(Err(err));
    }

    fn on_finish(&self, meta: CompileMeta, code: String) {
        debug!(builder = %self.label, module = %meta.name, bytes = code.len(), "compile finished");
        self.settle(Ok((meta, code)));
    }

    fn compress(&self, filename: String, source: String, _opts: Value) -> ToolFuture<'_, String> {
        let request = MinifyRequest::new(filename, source).define("DEBUG", "false");
        self.minifier.minify(request)
    }
}
