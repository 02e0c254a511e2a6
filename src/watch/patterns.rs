// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::Result;
use crate::fs::FileSystem;

/// Build output never triggers a rebuild.
pub const BUILD_EXCLUDE: &str = "build/**";

/// Compiled watch/exclude glob patterns for one trigger class of a builder
/// (e.g. `html`, `stylus`).
///
/// Patterns are relative to the module root. The watcher passes relative
/// paths (e.g. `"src/css/main.styl"`) into [`TriggerProfile::matches`].
#[derive(Clone)]
pub struct TriggerProfile {
    name: String,
    watch_set: GlobSet,
    exclude_set: GlobSet,
}

impl fmt::Debug for TriggerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TriggerProfile {
    /// Compile a profile. [`BUILD_EXCLUDE`] is always added to `exclude`.
    pub fn new(name: impl Into<String>, watch: &[String], exclude: &[String]) -> Result<Self> {
        let name = name.into();

        let watch_set = build_globset(watch)
            .with_context(|| format!("building watch globset for trigger {name}"))?;

        let mut exclude_patterns = exclude.to_vec();
        exclude_patterns.push(BUILD_EXCLUDE.to_string());
        let exclude_set = build_globset(&exclude_patterns)
            .with_context(|| format!("building exclude globset for trigger {name}"))?;

        Ok(Self {
            name,
            watch_set,
            exclude_set,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this trigger is interested in `rel_path`.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path) && !self.exclude_set.is_match(rel_path)
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Build a GlobSet for selecting files on disk: `*` stops at `/`, so
/// `*.styl` only matches top-level entries and `**` is needed to descend.
pub fn build_file_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Glob pattern rooted at `prefix` (relative, forward slashes), with glob
/// metacharacters in the prefix escaped.
pub fn rooted_pattern(prefix: &Path, pattern: &str) -> String {
    let prefix = prefix.to_string_lossy().replace('\\', "/");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() || prefix == "." {
        pattern.to_string()
    } else {
        format!("{}/{pattern}", globset::escape(prefix))
    }
}

/// Collect every file under `base` whose path relative to `base` matches
/// `set`, sorted for deterministic output.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    base: &Path,
    set: &GlobSet,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(base) {
        return Ok(files);
    }

    let mut stack = vec![base.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(base) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if set.is_match(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn pats(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn build_output_is_always_excluded() {
        let profile = TriggerProfile::new("any", &pats(&["**/*"]), &[]).unwrap();
        assert!(profile.matches("src/index.html"));
        assert!(!profile.matches("build/src/index.html"));
    }

    #[test]
    fn explicit_excludes_apply() {
        let profile =
            TriggerProfile::new("js", &pats(&["src/**/*.js"]), &pats(&["src/vendor/**"])).unwrap();
        assert!(profile.matches("src/a/b.js"));
        assert!(!profile.matches("src/vendor/lib.js"));
        assert!(!profile.matches("src/a/b.css"));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(TriggerProfile::new("bad", &pats(&["src/["]), &[]).is_err());
    }

    #[test]
    fn rooted_pattern_escapes_prefix() {
        assert_eq!(rooted_pattern(Path::new("app"), "**/*.html"), "app/**/*.html");
        assert_eq!(rooted_pattern(Path::new("."), "css/**/*"), "css/**/*");
        assert_eq!(rooted_pattern(Path::new("we[ird]"), "*.js"), "we[[]ird[]]/*.js");
    }

    #[test]
    fn collects_matching_files_relative_to_base() {
        let fs = MockFileSystem::new();
        fs.add_file("/m/src/index.html", "<html>");
        fs.add_file("/m/src/about/page.html", "<html>");
        fs.add_file("/m/src/app.js", "x");

        let set = build_globset(&pats(&["**/*.html"])).unwrap();
        let files = collect_matching_files(&fs, Path::new("/m/src"), &set).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/m/src/about/page.html"),
                PathBuf::from("/m/src/index.html"),
            ]
        );
    }

    #[test]
    fn missing_base_yields_nothing() {
        let fs = MockFileSystem::new();
        let set = build_globset(&pats(&["**/*"])).unwrap();
        assert!(collect_matching_files(&fs, Path::new("/nope"), &set)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn file_globs_do_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/m/css/main.styl", "");
        fs.add_file("/m/css/lib/vars.styl", "");
        fs.add_file("/m/pages/index.html", "");
        fs.add_file("/m/index.html", "");

        let top = build_file_globset(&pats(&["*.styl"])).unwrap();
        assert_eq!(
            collect_matching_files(&fs, Path::new("/m/css"), &top).unwrap(),
            vec![PathBuf::from("/m/css/main.styl")]
        );

        let deep = build_file_globset(&pats(&["**/*.html"])).unwrap();
        assert_eq!(
            collect_matching_files(&fs, Path::new("/m"), &deep).unwrap(),
            vec![PathBuf::from("/m/index.html"), PathBuf::from("/m/pages/index.html")]
        );
    }
}
