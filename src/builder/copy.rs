// src/builder/copy.rs

//! Glob-driven file copies, exposed as event streams.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::livereload::LiveReload;
use crate::task::{event_stream, EventStream, StreamEmitter};
use crate::watch::{build_file_globset, collect_matching_files};

/// Copy every file under `base` matching `patterns` into `dest`, keeping
/// paths relative to `base`.
#[derive(Debug, Clone)]
pub struct CopyJob {
    pub base: PathBuf,
    pub patterns: Vec<String>,
    pub dest: PathBuf,
}

impl CopyJob {
    pub fn new(base: impl Into<PathBuf>, pattern: &str, dest: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            patterns: vec![pattern.to_string()],
            dest: dest.into(),
        }
    }
}

/// Start the copy on the blocking pool and return its event stream.
///
/// Emits one `Data` item per written file, then `End`, or `Error` on the
/// first failure. With `livereload`, every written file is also broadcast.
pub fn copy_files(
    fs: Arc<dyn FileSystem>,
    job: CopyJob,
    livereload: Option<LiveReload>,
) -> EventStream {
    let (emitter, stream) = event_stream();
    tokio::task::spawn_blocking(move || {
        let result = copy_all(fs.as_ref(), &job, livereload.as_ref(), &emitter);
        emitter.finish(result);
    });
    stream
}

fn copy_all(
    fs: &dyn FileSystem,
    job: &CopyJob,
    livereload: Option<&LiveReload>,
    emitter: &StreamEmitter,
) -> Result<()> {
    let set = build_file_globset(&job.patterns)?;
    for file in collect_matching_files(fs, &job.base, &set)? {
        // Output living under the source tree (src = ".") is not an input.
        if file.starts_with(&job.dest) && job.dest != job.base {
            continue;
        }
        let Some(to) = target_path(&job.base, &file, &job.dest) else {
            continue;
        };
        fs.copy(&file, &to)?;
        debug!(from = ?file, to = ?to, "copied");
        if let Some(lr) = livereload {
            lr.notify(to.to_string_lossy());
        }
        emitter.data(to);
    }
    Ok(())
}

fn target_path(base: &Path, file: &Path, dest: &Path) -> Option<PathBuf> {
    file.strip_prefix(base).ok().map(|rel| dest.join(rel))
}
