// src/manifest/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::BuilderKind;

/// The parts of a module's `package.json` the orchestrator consumes.
///
/// ```json
/// {
///   "name": "my-plugin",
///   "devkit": {
///     "pluginBuilder": {
///       "jsio": [{ "src": "src/clientapi" }],
///       "generic": [{ "src": "inspector", "minified": "app.min.js" }]
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPackage {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub devkit: Option<DevkitSection>,
}

/// `devkit` block of `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevkitSection {
    #[serde(rename = "pluginBuilder", default)]
    pub plugin_builder: Option<BTreeMap<String, Vec<TargetDescriptor>>>,
}

/// One build target entry. `src` is shared by every builder kind; the other
/// fields only matter to the kind that reads them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    /// Source directory, relative to the module root.
    pub src: String,

    /// Generic: bundle entry point inside `src` (default `index.js`).
    #[serde(default)]
    pub entry: Option<String>,

    /// Generic: unminified bundle file name (default `build.js`).
    #[serde(default)]
    pub bundle: Option<String>,

    /// Generic: minified bundle file name (default `build.min.js`).
    #[serde(default)]
    pub minified: Option<String>,

    /// Jsio: main module imported as `src.<main>`, where the `src` alias
    /// points at the parent of the source directory (default: last path
    /// component of `src`).
    #[serde(default)]
    pub main: Option<String>,

    /// Jsio: compiled output file name (default `index.js`).
    #[serde(default)]
    pub output: Option<String>,
}

impl TargetDescriptor {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            entry: None,
            bundle: None,
            minified: None,
            main: None,
            output: None,
        }
    }

    pub fn entry_name(&self) -> &str {
        self.entry.as_deref().unwrap_or("index.js")
    }

    pub fn bundle_name(&self) -> &str {
        self.bundle.as_deref().unwrap_or("build.js")
    }

    pub fn minified_name(&self) -> &str {
        self.minified.as_deref().unwrap_or("build.min.js")
    }

    pub fn main_module(&self) -> String {
        match &self.main {
            Some(main) => main.clone(),
            None => self
                .src
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn output_name(&self) -> &str {
        self.output.as_deref().unwrap_or("index.js")
    }
}

/// Loaded build manifest. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub name: String,
    pub version: Option<String>,
    targets: BTreeMap<String, Vec<TargetDescriptor>>,
}

impl Manifest {
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        targets: BTreeMap<String, Vec<TargetDescriptor>>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            targets,
        }
    }

    /// Descriptors declared for `kind`, in manifest order. Empty when the
    /// kind has no entry.
    pub fn targets_for(&self, kind: BuilderKind) -> &[TargetDescriptor] {
        self.targets
            .get(kind.manifest_key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Keys of the build block that match no known builder kind.
    pub fn unknown_kinds(&self) -> Vec<&str> {
        self.targets
            .keys()
            .map(String::as_str)
            .filter(|key| BuilderKind::from_manifest_key(key).is_none())
            .collect()
    }

    pub fn target_count(&self) -> usize {
        BuilderKind::ALL
            .iter()
            .map(|kind| self.targets_for(*kind).len())
            .sum()
    }
}
