// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{BuildOptions, RawBuildOptions};
use crate::errors::Result;

/// Load an options file from a given path and return the raw `RawBuildOptions`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBuildOptions> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let options: RawBuildOptions = toml::from_str(&contents)?;

    Ok(options)
}

/// Load an options file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BuildOptions> {
    let raw = load_from_path(&path)?;
    BuildOptions::try_from(raw)
}

/// Options for a run: the given file if any, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<BuildOptions> {
    match path {
        Some(path) => load_and_validate(path),
        None => Ok(BuildOptions::default()),
    }
}
