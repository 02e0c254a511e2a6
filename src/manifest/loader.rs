// src/manifest/loader.rs

use std::path::{Component, Path};

use tracing::{info, warn};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::manifest::model::{Manifest, RawPackage, TargetDescriptor};

pub const MANIFEST_FILE: &str = "package.json";

/// Read the module's `package.json` and extract its build block.
///
/// - Missing or unparseable metadata is fatal ([`BuildError::NoManifest`]).
/// - Metadata without `devkit.pluginBuilder` is not an error: a warning is
///   logged and `None` returned.
/// - Descriptors with an unusable `src` are a [`BuildError::Config`].
pub fn load_manifest(fs: &dyn FileSystem, module_path: &Path) -> Result<Option<Manifest>> {
    info!(module = ?module_path, "loading module");

    let path = module_path.join(MANIFEST_FILE);
    let contents = fs.read_to_string(&path).map_err(|e| BuildError::NoManifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let raw: RawPackage =
        serde_json::from_str(&contents).map_err(|e| BuildError::NoManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let Some(targets) = raw.devkit.and_then(|d| d.plugin_builder) else {
        warn!(module = ?module_path, "module did not specify a devkit.pluginBuilder");
        return Ok(None);
    };

    for (kind, descriptors) in &targets {
        for descriptor in descriptors {
            validate_descriptor(kind, descriptor)?;
        }
    }

    let name = raw.name.unwrap_or_else(|| fallback_name(module_path));
    let manifest = Manifest::new(name, raw.version, targets);

    for kind in manifest.unknown_kinds() {
        warn!(kind, "ignoring unknown builder kind in devkit.pluginBuilder");
    }

    Ok(Some(manifest))
}

fn fallback_name(module_path: &Path) -> String {
    module_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string())
}

fn validate_descriptor(kind: &str, descriptor: &TargetDescriptor) -> Result<()> {
    let src = Path::new(&descriptor.src);
    if descriptor.src.trim().is_empty() {
        return Err(BuildError::Config(format!(
            "pluginBuilder.{kind}: descriptor has an empty `src`"
        )));
    }

    let escapes = src
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(BuildError::Config(format!(
            "pluginBuilder.{kind}: `src` must be a relative path inside the module (got '{}')",
            descriptor.src
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::types::BuilderKind;

    fn module_with(json: &str) -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("mod/package.json", json);
        fs
    }

    #[test]
    fn missing_package_json_is_fatal() {
        let fs = MockFileSystem::new();
        let err = load_manifest(&fs, Path::new("mod")).unwrap_err();
        assert!(matches!(err, BuildError::NoManifest { .. }));
    }

    #[test]
    fn unparseable_package_json_is_fatal() {
        let fs = module_with("{ not json");
        let err = load_manifest(&fs, Path::new("mod")).unwrap_err();
        assert!(matches!(err, BuildError::NoManifest { .. }));
    }

    #[test]
    fn missing_build_block_is_none() {
        let fs = module_with(r#"{ "name": "m", "devkit": {} }"#);
        assert!(load_manifest(&fs, Path::new("mod")).unwrap().is_none());

        let fs = module_with(r#"{ "name": "m" }"#);
        assert!(load_manifest(&fs, Path::new("mod")).unwrap().is_none());
    }

    #[test]
    fn descriptors_keep_manifest_order() {
        let fs = module_with(
            r#"{
                "name": "m",
                "devkit": { "pluginBuilder": {
                    "generic": [{ "src": "b" }, { "src": "a", "minified": "x.min.js" }],
                    "other": [{ "src": "c" }]
                } }
            }"#,
        );
        let manifest = load_manifest(&fs, Path::new("mod")).unwrap().unwrap();
        let generic = manifest.targets_for(BuilderKind::Generic);
        assert_eq!(generic.len(), 2);
        assert_eq!(generic[0].src, "b");
        assert_eq!(generic[1].minified_name(), "x.min.js");
        assert!(manifest.targets_for(BuilderKind::Jsio).is_empty());
        assert_eq!(manifest.unknown_kinds(), vec!["other"]);
        assert_eq!(manifest.target_count(), 2);
    }

    #[test]
    fn escaping_src_is_rejected() {
        let fs = module_with(
            r#"{ "name": "m", "devkit": { "pluginBuilder": { "jsio": [{ "src": "../x" }] } } }"#,
        );
        let err = load_manifest(&fs, Path::new("mod")).unwrap_err();
        assert!(matches!(err, BuildError::Config(msg) if msg.contains("relative")));
    }

    #[test]
    fn name_falls_back_to_directory() {
        let fs = module_with(r#"{ "devkit": { "pluginBuilder": {} } }"#);
        let manifest = load_manifest(&fs, Path::new("mod")).unwrap().unwrap();
        assert_eq!(manifest.name, "mod");
        assert_eq!(manifest.target_count(), 0);
    }

    #[test]
    fn main_module_defaults_to_last_src_component() {
        let d = TargetDescriptor::new("src/clientapi");
        assert_eq!(d.main_module(), "clientapi");
        assert_eq!(TargetDescriptor::new("ui").main_module(), "ui");
        assert_eq!(d.output_name(), "index.js");
        assert_eq!(d.entry_name(), "index.js");
        assert_eq!(d.bundle_name(), "build.js");
    }
}
