// src/config/mod.rs

//! Orchestrator options.
//!
//! Responsibilities:
//! - Define the TOML-backed options model (`model.rs`).
//! - Load an options file from disk (`loader.rs`).
//! - Validate basic invariants like non-empty tool programs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    BuildOptions, LiveReloadSection, RawBuildOptions, ResolveSection, ToolCommand, ToolsSection,
};
