// src/builder/bower.rs

//! Main-file extraction from an installed bower dependency tree.
//!
//! Dependencies are visited depth-first, each package's own dependencies
//! before the package itself, so concatenated output loads in a usable
//! order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::watch::{build_file_globset, collect_matching_files};

pub const BOWER_JSON: &str = "bower.json";
const BOWERRC: &str = ".bowerrc";
const DEFAULT_COMPONENTS_DIR: &str = "bower_components";
const FONT_EXTENSIONS: [&str; 4] = ["eot", "ttf", "woff", "woff2"];

#[derive(Debug, Default, Deserialize)]
struct BowerPackage {
    #[serde(default)]
    main: Option<Value>,
    #[serde(default)]
    dependencies: Map<String, Value>,
    #[serde(default)]
    overrides: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct BowerRc {
    directory: Option<String>,
}

/// Main files of the dependency tree, grouped by asset kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BowerAssets {
    pub js: Vec<PathBuf>,
    pub css: Vec<PathBuf>,
    pub fonts: Vec<PathBuf>,
}

impl BowerAssets {
    fn push(&mut self, file: PathBuf) {
        let ext = file
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "js" => self.js.push(file),
            "css" => self.css.push(file),
            e if FONT_EXTENSIONS.contains(&e) => self.fonts.push(file),
            _ => debug!(file = ?file, "ignoring bower main file"),
        }
    }
}

/// Where installed components live: `.bowerrc` `directory`, or
/// `bower_components`.
pub fn components_dir(fs: &dyn FileSystem, module_root: &Path) -> PathBuf {
    let rc_path = module_root.join(BOWERRC);
    let configured = fs
        .read_to_string(&rc_path)
        .ok()
        .and_then(|raw| serde_json::from_str::<BowerRc>(&raw).ok())
        .and_then(|rc| rc.directory);
    module_root.join(configured.as_deref().unwrap_or(DEFAULT_COMPONENTS_DIR))
}

fn read_package(fs: &dyn FileSystem, dir: &Path) -> Result<Option<BowerPackage>> {
    // Installed packages carry their resolved metadata in `.bower.json`.
    for name in [BOWER_JSON, ".bower.json"] {
        let path = dir.join(name);
        if fs.is_file(&path) {
            let raw = fs.read_to_string(&path)?;
            return Ok(Some(serde_json::from_str(&raw)?));
        }
    }
    Ok(None)
}

fn main_entries(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '[', '{'])
}

/// Resolve the main files of every dependency declared by the module's
/// `bower.json`, deduplicated, dependencies first.
pub fn main_files(fs: &dyn FileSystem, module_root: &Path) -> Result<Vec<PathBuf>> {
    let root = read_package(fs, module_root)?.ok_or_else(|| {
        BuildError::Config(format!("no {BOWER_JSON} in {:?}", module_root))
    })?;
    let components = components_dir(fs, module_root);

    let mut walk = Walk {
        fs,
        components: &components,
        overrides: &root.overrides,
        visited: HashSet::new(),
        files: Vec::new(),
    };
    for name in root.dependencies.keys() {
        walk.visit(name)?;
    }

    let mut seen = HashSet::new();
    let mut files = walk.files;
    files.retain(|f| seen.insert(f.clone()));
    Ok(files)
}

struct Walk<'a> {
    fs: &'a dyn FileSystem,
    components: &'a Path,
    overrides: &'a Map<String, Value>,
    visited: HashSet<String>,
    files: Vec<PathBuf>,
}

impl Walk<'_> {
    fn visit(&mut self, name: &str) -> Result<()> {
        if !self.visited.insert(name.to_string()) {
            return Ok(());
        }

        let dir = self.components.join(name);
        let Some(package) = read_package(self.fs, &dir)? else {
            warn!(dependency = name, "bower dependency is not installed");
            return Ok(());
        };

        for dep in package.dependencies.keys() {
            self.visit(dep)?;
        }

        let main = self
            .overrides
            .get(name)
            .and_then(|o| o.get("main"))
            .or(package.main.as_ref());
        let Some(main) = main else {
            debug!(dependency = name, "bower dependency declares no main files");
            return Ok(());
        };

        for entry in main_entries(main) {
            let entry = entry.trim_start_matches("./");
            if is_glob(entry) {
                let set = build_file_globset(&[entry.to_string()])?;
                self.files.extend(collect_matching_files(self.fs, &dir, &set)?);
            } else {
                let path = dir.join(entry);
                if self.fs.is_file(&path) {
                    self.files.push(path);
                } else {
                    warn!(dependency = name, file = ?path, "bower main file missing");
                }
            }
        }
        Ok(())
    }
}

/// Group main files by kind and write them out:
/// `<bower_dest>/bower.js`, `<bower_dest>/bower.css`, fonts into `font_dest`.
pub fn extract(
    fs: &dyn FileSystem,
    module_root: &Path,
    bower_dest: &Path,
    font_dest: &Path,
) -> Result<BowerAssets> {
    let mut assets = BowerAssets::default();
    for file in main_files(fs, module_root)? {
        assets.push(file);
    }

    write_concat(fs, &assets.js, &bower_dest.join("bower.js"))?;
    write_concat(fs, &assets.css, &bower_dest.join("bower.css"))?;
    for font in &assets.fonts {
        if let Some(name) = font.file_name() {
            fs.copy(font, &font_dest.join(name))?;
        }
    }

    debug!(
        js = assets.js.len(),
        css = assets.css.len(),
        fonts = assets.fonts.len(),
        "bower assets extracted"
    );
    Ok(assets)
}

fn write_concat(fs: &dyn FileSystem, files: &[PathBuf], out: &Path) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    let mut parts = Vec::with_capacity(files.len());
    for file in files {
        parts.push(fs.read_to_string(file)?);
    }
    fs.write(out, parts.join("\n").as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn module() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/m/bower.json",
            r#"{ "dependencies": { "widgets": "*", "jquery": "*" },
                 "overrides": { "widgets": { "main": ["dist/widgets.js", "dist/widgets.css"] } } }"#,
        );
        fs.add_file(
            "/m/bower_components/widgets/bower.json",
            r#"{ "main": "widgets.js", "dependencies": { "jquery": "*" } }"#,
        );
        fs.add_file("/m/bower_components/widgets/dist/widgets.js", "W");
        fs.add_file("/m/bower_components/widgets/dist/widgets.css", ".w{}");
        fs.add_file(
            "/m/bower_components/jquery/.bower.json",
            r#"{ "main": ["dist/jquery.js", "fonts/*.woff"] }"#,
        );
        fs.add_file("/m/bower_components/jquery/dist/jquery.js", "J");
        fs.add_file("/m/bower_components/jquery/fonts/icons.woff", "F");
        fs
    }

    #[test]
    fn dependencies_come_first_and_overrides_win() {
        let fs = module();
        let files = main_files(&fs, Path::new("/m")).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/m/bower_components/jquery/dist/jquery.js"),
                PathBuf::from("/m/bower_components/jquery/fonts/icons.woff"),
                PathBuf::from("/m/bower_components/widgets/dist/widgets.js"),
                PathBuf::from("/m/bower_components/widgets/dist/widgets.css"),
            ]
        );
    }

    #[test]
    fn extract_concatenates_and_copies_fonts() {
        let fs = module();
        let assets = extract(
            &fs,
            Path::new("/m"),
            Path::new("/m/build/app/bower"),
            Path::new("/m/build/app/fonts"),
        )
        .unwrap();

        assert_eq!(assets.js.len(), 2);
        assert_eq!(
            fs.contents("/m/build/app/bower/bower.js").as_deref(),
            Some(&b"J\nW"[..])
        );
        assert_eq!(
            fs.contents("/m/build/app/bower/bower.css").as_deref(),
            Some(&b".w{}"[..])
        );
        assert!(fs.contents("/m/build/app/fonts/icons.woff").is_some());
    }

    #[test]
    fn bowerrc_directory_is_honoured() {
        let fs = MockFileSystem::new();
        fs.add_file("/m/.bowerrc", r#"{ "directory": "vendor" }"#);
        fs.add_file("/m/bower.json", r#"{ "dependencies": { "a": "*" } }"#);
        fs.add_file("/m/vendor/a/bower.json", r#"{ "main": "a.css" }"#);
        fs.add_file("/m/vendor/a/a.css", "a");

        assert_eq!(components_dir(&fs, Path::new("/m")), PathBuf::from("/m/vendor"));
        assert_eq!(
            main_files(&fs, Path::new("/m")).unwrap(),
            vec![PathBuf::from("/m/vendor/a/a.css")]
        );
    }

    #[test]
    fn uninstalled_dependencies_are_skipped() {
        let fs = MockFileSystem::new();
        fs.add_file("/m/bower.json", r#"{ "dependencies": { "ghost": "*" } }"#);
        assert!(main_files(&fs, Path::new("/m")).unwrap().is_empty());
    }

    #[test]
    fn cyclic_dependencies_terminate() {
        let fs = MockFileSystem::new();
        fs.add_file("/m/bower.json", r#"{ "dependencies": { "a": "*" } }"#);
        fs.add_file("/m/bower_components/a/bower.json", r#"{ "main": "a.js", "dependencies": { "b": "*" } }"#);
        fs.add_file("/m/bower_components/a/a.js", "a");
        fs.add_file("/m/bower_components/b/bower.json", r#"{ "main": "b.js", "dependencies": { "a": "*" } }"#);
        fs.add_file("/m/bower_components/b/b.js", "b");

        assert_eq!(
            main_files(&fs, Path::new("/m")).unwrap(),
            vec![
                PathBuf::from("/m/bower_components/b/b.js"),
                PathBuf::from("/m/bower_components/a/a.js"),
            ]
        );
    }
}
