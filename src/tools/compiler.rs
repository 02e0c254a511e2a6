// src/tools/compiler.rs

//! Script compiler service: a start request plus a callback table.
//!
//! The service owns the compile; the caller only observes it through the
//! [`CompilerInterface`] it hands in. Exactly one of `on_error` /
//! `on_finish` fires per request.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ToolCommand;
use crate::errors::{BuildError, Result};
use crate::tools::process::{run_tool, ToolInvocation};
use crate::tools::ToolFuture;

/// Start request sent to the compiler service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    /// `[program, source path, import directive]`.
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub environment: String,
    pub path: Vec<PathBuf>,
    pub include_jsio: bool,
    pub append_import: bool,
    pub compress_sources: bool,
    pub compress_result: bool,
    /// Logical path alias -> filesystem location.
    pub path_cache: BTreeMap<String, PathBuf>,
}

impl CompileRequest {
    pub fn source_path(&self) -> Option<&str> {
        self.args.get(1).map(String::as_str)
    }

    pub fn import_directive(&self) -> Option<&str> {
        self.args.get(2).map(String::as_str)
    }
}

/// Metadata passed to `on_finish` alongside the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileMeta {
    pub name: String,
}

/// Handle the service gives back through `set_compiler`, used for
/// follow-up compiles.
pub trait CompilerHandle: Send + Sync + std::fmt::Debug {
    fn run(&self, args: Vec<String>, opts: Value) -> ToolFuture<'_, ()>;
}

/// Callback table the caller supplies with each request.
pub trait CompilerInterface: Send + Sync {
    fn set_compiler(&self, compiler: Arc<dyn CompilerHandle>);
    fn run(&self, args: Vec<String>, opts: Value);
    fn on_error(&self, err: BuildError);
    fn on_finish(&self, meta: CompileMeta, code: String);
    /// Minify an intermediate artifact on the service's behalf.
    fn compress(&self, filename: String, source: String, opts: Value) -> ToolFuture<'_, String>;
}

pub trait CompilerService: Send + Sync + std::fmt::Debug {
    /// Kick off a compile. Returns immediately; results arrive through
    /// `iface`.
    fn start(&self, request: CompileRequest, iface: Arc<dyn CompilerInterface>);
}

/// Compiler service backed by an external program.
///
/// The request is written to the program's stdin as JSON, the compiled code
/// is read from stdout.
#[derive(Debug, Clone)]
pub struct ProcessCompilerService {
    tool: ToolCommand,
}

impl ProcessCompilerService {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }
}

#[derive(Debug)]
struct ProcessCompilerHandle {
    tool: ToolCommand,
}

impl CompilerHandle for ProcessCompilerHandle {
    fn run(&self, args: Vec<String>, opts: Value) -> ToolFuture<'_, ()> {
        Box::pin(async move {
            run_tool(
                &self.tool,
                ToolInvocation {
                    args,
                    stdin: Some(opts.to_string()),
                    ..Default::default()
                },
            )
            .await?;
            Ok(())
        })
    }
}

async fn compile_once(
    tool: &ToolCommand,
    request: &CompileRequest,
    iface: &dyn CompilerInterface,
) -> Result<(CompileMeta, String)> {
    let payload = serde_json::to_string(request)?;
    let code = run_tool(
        tool,
        ToolInvocation {
            args: request.args.iter().skip(1).cloned().collect(),
            stdin: Some(payload),
            cwd: Some(&request.cwd),
            env: Vec::new(),
        },
    )
    .await?;

    let name = request
        .import_directive()
        .and_then(|d| d.strip_prefix("import "))
        .unwrap_or_default()
        .to_string();

    let code = if request.compress_result {
        debug!(module = %name, "compressing compile result");
        iface
            .compress(format!("{name}.js"), code, Value::Object(Default::default()))
            .await?
    } else {
        code
    };

    Ok((CompileMeta { name }, code))
}

impl CompilerService for ProcessCompilerService {
    fn start(&self, request: CompileRequest, iface: Arc<dyn CompilerInterface>) {
        let tool = self.tool.clone();
        tokio::spawn(async move {
            iface.set_compiler(Arc::new(ProcessCompilerHandle { tool: tool.clone() }));
            match compile_once(&tool, &request, iface.as_ref()).await {
                Ok((meta, code)) => iface.on_finish(meta, code),
                Err(err) => {
                    warn!(error = %err, "compiler service failed");
                    iface.on_error(err);
                }
            }
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    enum Outcome {
        Finished(CompileMeta, String),
        Failed(BuildError),
    }

    struct Recorder {
        tx: Mutex<Option<oneshot::Sender<Outcome>>>,
        compiler_set: Mutex<bool>,
    }

    impl Recorder {
        fn new() -> (Arc<Self>, oneshot::Receiver<Outcome>) {
            let (tx, rx) = oneshot::channel();
            let rec = Arc::new(Self {
                tx: Mutex::new(Some(tx)),
                compiler_set: Mutex::new(false),
            });
            (rec, rx)
        }

        fn settle(&self, outcome: Outcome) {
            if let Some(tx) = self.tx.lock().unwrap().take() {
                let _ = tx.send(outcome);
            }
        }
    }

    impl CompilerInterface for Recorder {
        fn set_compiler(&self, _compiler: Arc<dyn CompilerHandle>) {
            *self.compiler_set.lock().unwrap() = true;
        }
        fn run(&self, _args: Vec<String>, _opts: Value) {}
        fn on_error(&self, err: BuildError) {
            self.settle(Outcome::Failed(err));
        }
        fn on_finish(&self, meta: CompileMeta, code: String) {
            self.settle(Outcome::Finished(meta, code));
        }
        fn compress(&self, _filename: String, source: String, _opts: Value) -> ToolFuture<'_, String> {
            Box::pin(async move { Ok(source.to_uppercase()) })
        }
    }

    fn request(compress_result: bool) -> CompileRequest {
        CompileRequest {
            args: vec![
                "jsio_compile".into(),
                "/tmp/mod/src".into(),
                "import src.main".into(),
            ],
            cwd: std::env::temp_dir(),
            environment: "browser".into(),
            path: vec![],
            include_jsio: false,
            append_import: true,
            compress_sources: false,
            compress_result,
            path_cache: BTreeMap::new(),
        }
    }

    fn script(body: &str) -> ToolCommand {
        // Extra positional args land in $1.. and are ignored by the script.
        ToolCommand::new("sh", &["-c", body, "sh"])
    }

    #[tokio::test]
    async fn finish_carries_stdout_and_module_name() {
        let service = ProcessCompilerService::new(script("cat >/dev/null; printf 'var a=1;'"));
        let (rec, rx) = Recorder::new();
        service.start(request(false), rec.clone());

        match rx.await.unwrap() {
            Outcome::Finished(meta, code) => {
                assert_eq!(meta.name, "src.main");
                assert_eq!(code, "var a=1;");
            }
            other => panic!("expected finish, got {other:?}"),
        }
        assert!(*rec.compiler_set.lock().unwrap());
    }

    #[tokio::test]
    async fn compress_result_routes_through_interface() {
        let service = ProcessCompilerService::new(script("cat >/dev/null; printf 'var a=1;'"));
        let (rec, rx) = Recorder::new();
        service.start(request(true), rec);

        match rx.await.unwrap() {
            Outcome::Finished(_, code) => assert_eq!(code, "VAR A=1;"),
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_failure_fires_on_error() {
        let service = ProcessCompilerService::new(script("cat >/dev/null; echo broken >&2; exit 2"));
        let (rec, rx) = Recorder::new();
        service.start(request(false), rec);

        match rx.await.unwrap() {
            Outcome::Failed(BuildError::ToolFailed { code, .. }) => assert_eq!(code, Some(2)),
            other => panic!("expected tool failure, got {other:?}"),
        }
    }

    #[test]
    fn request_serializes_camel_case() {
        let json = serde_json::to_value(request(false)).unwrap();
        assert_eq!(json["appendImport"], Value::Bool(true));
        assert_eq!(json["environment"], "browser");
        assert!(json.get("pathCache").is_some());
    }
}
