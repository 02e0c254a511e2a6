// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Orchestrator options as read from an optional TOML file.
///
/// ```toml
/// [livereload]
/// enabled = true
/// port = 35729
///
/// [tools.stylus]
/// program = "stylus"
/// args = ["--use", "nib", "--include-css"]
///
/// [resolve]
/// global_paths = ["/usr/local/lib/node_modules"]
/// ```
///
/// All sections are optional and have reasonable defaults. This value is
/// passed explicitly to the orchestrator; nothing mutates it afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBuildOptions {
    #[serde(default)]
    pub livereload: LiveReloadSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub resolve: ResolveSection,
}

/// Validated options. Construct through `TryFrom<RawBuildOptions>` or
/// [`BuildOptions::default`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub livereload: LiveReloadSection,
    pub tools: ToolsSection,
    pub resolve: ResolveSection,
}

impl BuildOptions {
    pub(crate) fn new_unchecked(raw: RawBuildOptions) -> Self {
        Self {
            livereload: raw.livereload,
            tools: raw.tools,
            resolve: raw.resolve,
        }
    }

    /// Apply the `--no-livereload` CLI override.
    pub fn with_livereload(mut self, enabled: bool) -> Self {
        self.livereload.enabled = enabled;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new_unchecked(RawBuildOptions::default())
    }
}

/// `[livereload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveReloadSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_livereload_host")]
    pub host: String,

    /// The conventional LiveReload port is 35729.
    #[serde(default = "default_livereload_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_livereload_host() -> String {
    "127.0.0.1".to_string()
}

fn default_livereload_port() -> u16 {
    35729
}

impl Default for LiveReloadSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: default_livereload_host(),
            port: default_livereload_port(),
        }
    }
}

/// An external program plus the fixed arguments placed before any
/// per-invocation arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// `[tools.*]` section: the external collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_stylus")]
    pub stylus: ToolCommand,

    #[serde(default = "default_bundler")]
    pub bundler: ToolCommand,

    #[serde(default = "default_minifier")]
    pub minifier: ToolCommand,

    #[serde(default = "default_installer")]
    pub installer: ToolCommand,

    #[serde(default = "default_compiler")]
    pub compiler: ToolCommand,
}

fn default_stylus() -> ToolCommand {
    ToolCommand::new("stylus", &["--use", "nib", "--include-css"])
}

fn default_bundler() -> ToolCommand {
    ToolCommand::new("browserify", &["-t", "babelify"])
}

fn default_minifier() -> ToolCommand {
    ToolCommand::new("uglifyjs", &["--compress", "--mangle"])
}

fn default_installer() -> ToolCommand {
    ToolCommand::new("bower", &["install"])
}

fn default_compiler() -> ToolCommand {
    ToolCommand::new("jsio_compile", &[])
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            stylus: default_stylus(),
            bundler: default_bundler(),
            minifier: default_minifier(),
            installer: default_installer(),
            compiler: default_compiler(),
        }
    }
}

/// `[resolve]` section: where to look for globally installed peer libraries
/// after the module-local and `NODE_PATH` locations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveSection {
    #[serde(default)]
    pub global_paths: Vec<PathBuf>,
}
