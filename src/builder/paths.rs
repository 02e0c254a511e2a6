// src/builder/paths.rs

use std::path::{Component, Path, PathBuf};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::manifest::TargetDescriptor;

/// Root of all build output inside a module.
pub const BUILD_ROOT: &str = "build";

/// Path set every builder derives from its target descriptor.
///
/// - `src_dir`   = `<module>/<src>`
/// - `build_dir` = `<module>/build/<src>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderPaths {
    module_root: PathBuf,
    module_name: String,
    descriptor: TargetDescriptor,
    src_dir: PathBuf,
    build_dir: PathBuf,
}

impl BuilderPaths {
    pub fn new(
        fs: &dyn FileSystem,
        module_root: &Path,
        module_name: &str,
        descriptor: TargetDescriptor,
    ) -> Result<Self> {
        if !fs.is_dir(module_root) {
            return Err(BuildError::Config(format!(
                "module root {:?} is not a readable directory",
                module_root
            )));
        }

        let src = Path::new(&descriptor.src);
        let safe = src
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if descriptor.src.trim().is_empty() || !safe {
            return Err(BuildError::Config(format!(
                "target src '{}' must be a relative path inside the module",
                descriptor.src
            )));
        }

        Ok(Self {
            module_root: module_root.to_path_buf(),
            module_name: module_name.to_string(),
            src_dir: module_root.join(src),
            build_dir: module_root.join(BUILD_ROOT).join(src),
            descriptor,
        })
    }

    pub fn module_root(&self) -> &Path {
        &self.module_root
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn descriptor(&self) -> &TargetDescriptor {
        &self.descriptor
    }

    /// The descriptor's `src`, as written in the manifest.
    pub fn src(&self) -> &str {
        &self.descriptor.src
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn derives_src_and_build_dirs() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mods/chat");

        let paths = BuilderPaths::new(
            &fs,
            Path::new("/mods/chat"),
            "chat",
            TargetDescriptor::new("ui/panel"),
        )
        .unwrap();

        assert_eq!(paths.src_dir(), Path::new("/mods/chat/ui/panel"));
        assert_eq!(paths.build_dir(), Path::new("/mods/chat/build/ui/panel"));
        assert_eq!(paths.src(), "ui/panel");
        assert_eq!(paths.module_name(), "chat");
    }

    #[test]
    fn missing_module_root_is_rejected() {
        let fs = MockFileSystem::new();
        let err = BuilderPaths::new(&fs, Path::new("/gone"), "m", TargetDescriptor::new("src"))
            .unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn escaping_src_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_dir("/m");
        for src in ["../other", "/abs", ""] {
            let res = BuilderPaths::new(&fs, Path::new("/m"), "m", TargetDescriptor::new(src));
            assert!(res.is_err(), "{src:?} should be rejected");
        }
    }
}
