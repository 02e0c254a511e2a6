// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `plugin-builder`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "plugin-builder",
    version,
    about = "Compile or watch the build targets declared in a plugin module's package.json.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plugin module (the directory holding `package.json`).
    ///
    /// Optional here so a missing path is reported by the program itself.
    #[arg(value_name = "MODULE_PATH")]
    pub module_path: Option<PathBuf>,

    /// Keep running and rebuild on file changes.
    #[arg(long)]
    pub watch: bool,

    /// Debug-level logging (shorthand for `--log-level debug`).
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PLUGIN_BUILDER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Do not start the live-reload listener in watch mode.
    #[arg(long)]
    pub no_livereload: bool,

    /// Optional options file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Load the manifest and print the resolved builders, but run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Explicit `--log-level` wins over `--verbose`.
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level),
            (None, true) => Some(LogLevel::Debug),
            (None, false) => None,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_invocation() {
        let args = CliArgs::try_parse_from([
            "plugin-builder",
            "mods/chat",
            "--watch",
            "--no-livereload",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.module_path, Some(PathBuf::from("mods/chat")));
        assert!(args.watch);
        assert!(args.no_livereload);
        assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));
    }

    #[test]
    fn module_path_is_optional_for_the_parser() {
        let args = CliArgs::try_parse_from(["plugin-builder"]).unwrap();
        assert!(args.module_path.is_none());
        assert!(!args.watch);
        assert_eq!(args.effective_log_level(), None);
    }

    #[test]
    fn explicit_level_beats_verbose() {
        let args =
            CliArgs::try_parse_from(["plugin-builder", "m", "-v", "--log-level", "warn"]).unwrap();
        assert_eq!(args.effective_log_level(), Some(LogLevel::Warn));
    }
}
