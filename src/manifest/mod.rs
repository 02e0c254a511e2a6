// src/manifest/mod.rs

//! Module build manifest (`package.json` → `devkit.pluginBuilder`).

pub mod loader;
pub mod model;

pub use loader::{load_manifest, MANIFEST_FILE};
pub use model::{DevkitSection, Manifest, RawPackage, TargetDescriptor};
