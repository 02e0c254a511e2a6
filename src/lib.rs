// src/lib.rs

pub mod builder;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod livereload;
pub mod logging;
pub mod manifest;
pub mod task;
pub mod tools;
pub mod types;
pub mod watch;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::engine::Orchestrator;
use crate::types::BuildMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - options loading (+ CLI overrides)
/// - the orchestrator run in compile or watch mode
/// - Ctrl-C handling for watch sessions
pub async fn run(args: CliArgs) -> Result<()> {
    let Some(module_path) = args.module_path.as_deref() else {
        error!("must specify a module path");
        anyhow::bail!("must specify a module path");
    };

    let options = load_or_default(args.config.as_deref())?.with_livereload(!args.no_livereload);
    let orchestrator = Orchestrator::new(options);

    if args.dry_run {
        return print_dry_run(&orchestrator, module_path);
    }

    let mode = if args.watch {
        BuildMode::Watch
    } else {
        BuildMode::Compile
    };
    let outcome = orchestrator.run(module_path, mode).await?;

    match outcome.session {
        Some(session) => {
            if let Some(addr) = session.livereload_addr() {
                info!(%addr, "live-reload listening");
            }
            info!("watching for changes; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            session.stop().await;
        }
        None => info!(
            module = ?outcome.module_path,
            builders = outcome.builders,
            tasks = outcome.completed.len(),
            "{} finished",
            outcome.mode
        ),
    }
    Ok(())
}

/// Simple dry-run output: print the builders the manifest resolves to.
fn print_dry_run(orchestrator: &Orchestrator, module_path: &Path) -> Result<()> {
    let module_path = std::path::absolute(module_path)?;
    println!("plugin-builder dry-run");
    println!("  module = {}", module_path.display());

    let Some(manifest) = orchestrator.load(&module_path)? else {
        println!("  no devkit.pluginBuilder block; nothing to build");
        return Ok(());
    };
    println!("  name = {}", manifest.name);
    println!();

    let builders = orchestrator.resolve_builders(&module_path, &manifest)?;
    println!("builders ({}):", builders.len());
    for builder in &builders {
        let paths = builder.paths();
        println!("  - {}", builder.label());
        println!("      src:   {}", paths.src_dir().display());
        println!("      build: {}", paths.build_dir().display());
    }

    let lr = &orchestrator.options().livereload;
    println!();
    println!(
        "livereload: {} ({}:{})",
        if lr.enabled { "on" } else { "off" },
        lr.host,
        lr.port
    );

    debug!("dry-run complete (no execution)");
    Ok(())
}
