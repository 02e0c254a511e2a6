//! In-process stand-ins for the external tools and the file watcher.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use plugin_builder::errors::{BuildError, Result};
use plugin_builder::tools::{
    BundleRequest, CompileMeta, CompileRequest, CompilerInterface, CompilerService, Minifier,
    MinifyRequest, PackageInstaller, ScriptBundler, StyleCompiler, StyleRequest, ToolFuture,
    Toolchain,
};
use plugin_builder::watch::{
    matching_triggers, TriggerFired, TriggerProfile, WatchBackend, WatchGuard,
};
use tokio::sync::{mpsc, Semaphore};

/// One recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Style { entry: PathBuf, sourcemap: bool },
    Bundle { entry: PathBuf, debug: bool },
    Minify { name: String },
    Install { dir: PathBuf },
    Compile { source: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeTool {
    Style,
    Bundler,
    Minifier,
    Installer,
    Compiler,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Mutex<Vec<ToolCall>>,
    failing: Mutex<HashSet<FakeTool>>,
    silent_compiler: Mutex<bool>,
    gates: Mutex<HashMap<FakeTool, Arc<Semaphore>>>,
}

/// Deterministic fake for every tool seam.
///
/// Outputs are derived from the inputs so tests can assert on them:
/// - style: `/* css:<file name> */`
/// - bundle: `// bundle:<file name>`
/// - minify: `/*min*/<source>`
/// - compile: `exports.main = 1;`
#[derive(Debug, Clone, Default)]
pub struct FakeTools {
    state: Arc<FakeState>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `tool` fail.
    pub fn fail(&self, tool: FakeTool) -> &Self {
        self.state.failing.lock().unwrap().insert(tool);
        self
    }

    /// The compiler drops the request without calling back.
    pub fn silence_compiler(&self) -> &Self {
        *self.state.silent_compiler.lock().unwrap() = true;
        self
    }

    /// Hold every later call to `tool` after it is recorded, until the
    /// returned semaphore is given a permit per call.
    pub fn hold(&self, tool: FakeTool) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.gates.lock().unwrap().insert(tool, Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ToolCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn toolchain(&self) -> Toolchain {
        let this = Arc::new(self.clone());
        Toolchain {
            style: this.clone(),
            bundler: this.clone(),
            minifier: this.clone(),
            installer: this.clone(),
            compiler: this,
        }
    }

    fn record(&self, tool: FakeTool, call: ToolCall) -> Result<()> {
        self.state.calls.lock().unwrap().push(call);
        if self.state.failing.lock().unwrap().contains(&tool) {
            return Err(BuildError::ToolFailed {
                tool: format!("{tool:?}").to_lowercase(),
                code: Some(1),
                stderr: "fake failure".to_string(),
            });
        }
        Ok(())
    }

    fn gate(&self, tool: FakeTool) -> Option<Arc<Semaphore>> {
        self.state.gates.lock().unwrap().get(&tool).cloned()
    }
}

async fn pass_gate(gate: Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl StyleCompiler for FakeTools {
    fn compile(&self, request: StyleRequest) -> ToolFuture<'_, String> {
        Box::pin(async move {
            self.record(
                FakeTool::Style,
                ToolCall::Style {
                    entry: request.entry.clone(),
                    sourcemap: request.sourcemap,
                },
            )?;
            pass_gate(self.gate(FakeTool::Style)).await;
            Ok(format!("/* css:{} */", file_name(&request.entry)))
        })
    }
}

impl ScriptBundler for FakeTools {
    fn bundle(&self, request: BundleRequest) -> ToolFuture<'_, String> {
        Box::pin(async move {
            self.record(
                FakeTool::Bundler,
                ToolCall::Bundle {
                    entry: request.entry.clone(),
                    debug: request.debug,
                },
            )?;
            pass_gate(self.gate(FakeTool::Bundler)).await;
            Ok(format!("// bundle:{}", file_name(&request.entry)))
        })
    }
}

impl Minifier for FakeTools {
    fn minify(&self, request: MinifyRequest) -> ToolFuture<'_, String> {
        Box::pin(async move {
            self.record(
                FakeTool::Minifier,
                ToolCall::Minify {
                    name: request.name.clone(),
                },
            )?;
            pass_gate(self.gate(FakeTool::Minifier)).await;
            Ok(format!("/*min*/{}", request.source))
        })
    }
}

impl PackageInstaller for FakeTools {
    fn install(&self, dir: PathBuf) -> ToolFuture<'_, ()> {
        Box::pin(async move {
            self.record(FakeTool::Installer, ToolCall::Install { dir })?;
            pass_gate(self.gate(FakeTool::Installer)).await;
            Ok(())
        })
    }
}

impl CompilerService for FakeTools {
    fn start(&self, request: CompileRequest, iface: Arc<dyn CompilerInterface>) {
        let source = request.source_path().unwrap_or_default().to_string();
        let outcome = self.record(FakeTool::Compiler, ToolCall::Compile { source });
        if *self.state.silent_compiler.lock().unwrap() {
            return;
        }
        let name = request
            .import_directive()
            .and_then(|d| d.strip_prefix("import "))
            .unwrap_or_default()
            .to_string();
        let gate = self.gate(FakeTool::Compiler);
        tokio::spawn(async move {
            pass_gate(gate).await;
            match outcome {
                Ok(()) => iface.on_finish(CompileMeta { name }, "exports.main = 1;".to_string()),
                Err(err) => iface.on_error(err),
            }
        });
    }
}

struct Registration {
    root: PathBuf,
    profiles: Vec<TriggerProfile>,
    tx: mpsc::Sender<TriggerFired>,
}

/// Watch backend driven by the test instead of the filesystem.
#[derive(Clone, Default)]
pub struct FakeWatchBackend {
    registrations: Arc<Mutex<Vec<Registration>>>,
    refuse: Arc<Mutex<bool>>,
}

impl fmt::Debug for FakeWatchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeWatchBackend")
            .field("registrations", &self.registrations.lock().unwrap().len())
            .finish()
    }
}

impl FakeWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later `watch` call fails, as if the root were unwatchable.
    pub fn refuse_watches(&self) {
        *self.refuse.lock().unwrap() = true;
    }

    pub fn registrations(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.root.clone())
            .collect()
    }

    /// Report a change of `rel_path` (relative to the module root) to every
    /// registered watch. Returns the number of triggers delivered.
    pub async fn fire_path(&self, rel_path: &str) -> usize {
        let targets: Vec<(mpsc::Sender<TriggerFired>, Vec<String>)> = self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                let names = matching_triggers(&r.profiles, rel_path)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (r.tx.clone(), names)
            })
            .collect();

        let mut delivered = 0;
        for (tx, names) in targets {
            for trigger in names {
                let fired = TriggerFired {
                    trigger,
                    path: rel_path.to_string(),
                };
                if tx.send(fired).await.is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

impl WatchBackend for FakeWatchBackend {
    fn watch(
        &self,
        root: &Path,
        profiles: Vec<TriggerProfile>,
        tx: mpsc::Sender<TriggerFired>,
    ) -> Result<WatchGuard> {
        if *self.refuse.lock().unwrap() {
            return Err(BuildError::Other(anyhow::anyhow!(
                "cannot watch {}",
                root.display()
            )));
        }
        self.registrations.lock().unwrap().push(Registration {
            root: root.to_path_buf(),
            profiles,
            tx,
        });
        Ok(WatchGuard::new(()))
    }
}
