#![allow(dead_code)]

use std::sync::Arc;

use plugin_builder::config::BuildOptions;
use plugin_builder::engine::Orchestrator;
pub use plugin_builder_test_utils::*;

/// Orchestrator wired to fakes, with the live-reload listener off so tests
/// never bind a port. The in-process broadcast still works.
pub fn fake_orchestrator(tools: &FakeTools, watcher: &FakeWatchBackend) -> Orchestrator {
    Orchestrator::new(BuildOptions::default().with_livereload(false))
        .with_toolchain(tools.toolchain())
        .with_watch_backend(Arc::new(watcher.clone()))
}
