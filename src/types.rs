use std::fmt;
use std::str::FromStr;

/// Which lifecycle the orchestrator runs on every builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// One-shot build; the batch settles when every step finished.
    Compile,
    /// Long-lived session; the batch settles once every watch is set up.
    Watch,
}

impl Default for BuildMode {
    fn default() -> Self {
        BuildMode::Compile
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Compile => f.write_str("compile"),
            BuildMode::Watch => f.write_str("watch"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compile" => Ok(BuildMode::Compile),
            "watch" => Ok(BuildMode::Watch),
            other => Err(format!(
                "invalid build mode: {other} (expected \"compile\" or \"watch\")"
            )),
        }
    }
}

/// Known builder kinds, keyed by their name in `devkit.pluginBuilder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderKind {
    Jsio,
    Generic,
}

impl BuilderKind {
    /// Every known kind, in the order the orchestrator visits them.
    pub const ALL: [BuilderKind; 2] = [BuilderKind::Jsio, BuilderKind::Generic];

    /// Key used in the manifest's `pluginBuilder` block.
    pub fn manifest_key(self) -> &'static str {
        match self {
            BuilderKind::Jsio => "jsio",
            BuilderKind::Generic => "generic",
        }
    }

    /// Prefix used in builder log labels.
    pub fn log_prefix(self) -> &'static str {
        match self {
            BuilderKind::Jsio => "JsioBuilder",
            BuilderKind::Generic => "GenericBuilder",
        }
    }

    pub fn from_manifest_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.manifest_key() == key)
    }
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_key())
    }
}
