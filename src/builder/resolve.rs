// src/builder/resolve.rs

//! Lookup of peer libraries installed next to (or globally for) a module.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs::FileSystem;

/// Where a lookup may search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveScope {
    /// `node_modules` directories from the module root upwards.
    ModuleOnly,
    /// Module-local first, then `NODE_PATH`, then configured global roots.
    Anywhere,
}

/// Ordered resolution strategy for installed packages.
#[derive(Debug, Clone)]
pub struct PeerResolver {
    module_root: PathBuf,
    node_path: Vec<PathBuf>,
    global_paths: Vec<PathBuf>,
}

impl PeerResolver {
    pub fn new(module_root: &Path, node_path: Vec<PathBuf>, global_paths: Vec<PathBuf>) -> Self {
        Self {
            module_root: module_root.to_path_buf(),
            node_path,
            global_paths,
        }
    }

    /// Resolver using the process' `NODE_PATH`.
    pub fn from_env(module_root: &Path, global_paths: Vec<PathBuf>) -> Self {
        let node_path = std::env::var_os("NODE_PATH")
            .map(|raw| std::env::split_paths(&raw).collect())
            .unwrap_or_default();
        Self::new(module_root, node_path, global_paths)
    }

    fn candidates(&self, scope: ResolveScope) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .module_root
            .ancestors()
            .map(|dir| dir.join("node_modules"))
            .collect();
        if scope == ResolveScope::Anywhere {
            roots.extend(self.node_path.iter().cloned());
            roots.extend(self.global_paths.iter().cloned());
        }
        roots
    }

    /// Directory of `package`, if installed in scope. `marker` names a file
    /// inside the package that must exist (e.g. `Widget.js`).
    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        package: &str,
        marker: Option<&str>,
        scope: ResolveScope,
    ) -> Option<PathBuf> {
        let found = self.candidates(scope).into_iter().find_map(|root| {
            let dir = root.join(package);
            let present = match marker {
                Some(file) => fs.is_file(&dir.join(file)),
                None => fs.is_dir(&dir),
            };
            present.then_some(dir)
        });
        debug!(package, found = ?found, "peer lookup");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn resolver() -> PeerResolver {
        PeerResolver::new(
            Path::new("/work/mods/chat"),
            vec![PathBuf::from("/node_path")],
            vec![PathBuf::from("/global")],
        )
    }

    #[test]
    fn module_local_copy_wins() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/mods/chat/node_modules/jsio");
        fs.add_dir("/global/jsio");
        assert_eq!(
            resolver().resolve(&fs, "jsio", None, ResolveScope::Anywhere),
            Some(PathBuf::from("/work/mods/chat/node_modules/jsio"))
        );
    }

    #[test]
    fn walks_up_from_the_module() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/node_modules/jsio");
        assert_eq!(
            resolver().resolve(&fs, "jsio", None, ResolveScope::ModuleOnly),
            Some(PathBuf::from("/work/node_modules/jsio"))
        );
    }

    #[test]
    fn falls_back_to_node_path_then_global() {
        let fs = MockFileSystem::new();
        fs.add_dir("/global/jsio");
        assert_eq!(
            resolver().resolve(&fs, "jsio", None, ResolveScope::Anywhere),
            Some(PathBuf::from("/global/jsio"))
        );

        fs.add_dir("/node_path/jsio");
        assert_eq!(
            resolver().resolve(&fs, "jsio", None, ResolveScope::Anywhere),
            Some(PathBuf::from("/node_path/jsio"))
        );
    }

    #[test]
    fn module_only_scope_ignores_globals() {
        let fs = MockFileSystem::new();
        fs.add_file("/global/squill/Widget.js", "");
        assert_eq!(
            resolver().resolve(&fs, "squill", Some("Widget.js"), ResolveScope::ModuleOnly),
            None
        );
    }

    #[test]
    fn marker_file_must_exist() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/mods/chat/node_modules/squill");
        assert_eq!(
            resolver().resolve(&fs, "squill", Some("Widget.js"), ResolveScope::ModuleOnly),
            None
        );
        fs.add_file("/work/mods/chat/node_modules/squill/Widget.js", "");
        assert!(resolver()
            .resolve(&fs, "squill", Some("Widget.js"), ResolveScope::ModuleOnly)
            .is_some());
    }
}
