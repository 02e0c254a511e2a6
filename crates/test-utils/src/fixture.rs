//! On-disk plugin modules for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tempfile::TempDir;

/// A plugin module living in a temporary directory.
///
/// The root is canonicalized so paths compare equal to what the
/// orchestrator derives.
pub struct ModuleFixture {
    _dir: TempDir,
    root: PathBuf,
}

impl ModuleFixture {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir
            .path()
            .canonicalize()
            .expect("canonicalize tempdir")
            .join(name);
        fs::create_dir_all(&root).expect("create module root");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `rel` (creating parent directories) and return its full path.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Sorted file names directly inside `rel`.
    pub fn list(&self, rel: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path(rel))
            .unwrap_or_else(|e| panic!("listing {rel}: {e}"))
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn with_manifest(self, manifest: ManifestBuilder) -> Self {
        self.write("package.json", &manifest.to_json());
        self
    }

    /// Plant an installed peer library under the module's `node_modules`.
    pub fn with_peer(self, package: &str, marker: Option<&str>) -> Self {
        let dir = self.path(&format!("node_modules/{package}"));
        fs::create_dir_all(&dir).expect("create peer dir");
        if let Some(file) = marker {
            fs::write(dir.join(file), "").expect("write peer marker");
        }
        self
    }
}

/// Builder for a module `package.json`.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    name: String,
    block: Option<Map<String, Value>>,
}

impl ManifestBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            block: Some(Map::new()),
        }
    }

    /// No `devkit.pluginBuilder` block at all.
    pub fn without_block(mut self) -> Self {
        self.block = None;
        self
    }

    pub fn generic(self, src: &str) -> Self {
        self.target("generic", json!({ "src": src }))
    }

    pub fn jsio(self, src: &str) -> Self {
        self.target("jsio", json!({ "src": src }))
    }

    /// Append a raw descriptor under `kind`.
    pub fn target(mut self, kind: &str, descriptor: Value) -> Self {
        let block = self.block.get_or_insert_with(Map::new);
        let list = block
            .entry(kind.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = list {
            items.push(descriptor);
        }
        self
    }

    pub fn to_json(&self) -> String {
        let mut package = json!({ "name": self.name, "version": "0.1.0" });
        if let Some(block) = &self.block {
            package["devkit"] = json!({ "pluginBuilder": Value::Object(block.clone()) });
        }
        serde_json::to_string_pretty(&package).expect("serialize manifest")
    }
}
