// src/builder/generic.rs

//! Web-asset builder: html/static/font copies, stylus, bower extraction and
//! an entry-point bundle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::builder::bower;
use crate::builder::copy::{copy_files, CopyJob};
use crate::builder::html::rewrite_build_blocks;
use crate::builder::{builder_label, BuildEnv, Builder, BuilderPaths};
use crate::engine::{RebuildFactory, WatchQueue};
use crate::errors::{BuildError, Result};
use crate::fs::run_blocking;
use crate::task::{run_as_task, TaskBatch, TaskHandle, TaskOutput};
use crate::tools::{BundleRequest, MinifyRequest, StyleRequest};
use crate::types::BuilderKind;
use crate::watch::{
    build_file_globset, collect_matching_files, rooted_pattern, TriggerFired, TriggerProfile,
};

const HTML_GLOB: &str = "**/*.html";

pub const TRIGGER_BOWER: &str = "bower";
pub const TRIGGER_HTML: &str = "html";
pub const TRIGGER_STATIC: &str = "static";
pub const TRIGGER_STYLUS: &str = "stylus";
pub const TRIGGER_BUNDLE: &str = "bundle";

/// Buffered triggers before the watcher backs off.
const TRIGGER_BUFFER: usize = 64;

/// Inputs and outputs of a generic build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericLayout {
    pub entry: PathBuf,
    pub css_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub static_dir: PathBuf,
    pub bower_json: PathBuf,
    /// `build/<src>`: html, css.
    pub dest: PathBuf,
    /// `build/<src>/build`: minified bundle.
    pub dest_build: PathBuf,
    /// `build/<src>/src`: watch-mode bundle.
    pub dest_src: PathBuf,
    pub dest_fonts: PathBuf,
    pub dest_static: PathBuf,
    pub dest_bower: PathBuf,
}

impl GenericLayout {
    pub fn new(paths: &BuilderPaths) -> Self {
        let src = paths.src_dir();
        let dest = paths.build_dir();
        Self {
            entry: src.join(paths.descriptor().entry_name()),
            css_dir: src.join("css"),
            fonts_dir: src.join("fonts"),
            static_dir: src.join("static"),
            bower_json: paths.module_root().join(bower::BOWER_JSON),
            dest: dest.to_path_buf(),
            dest_build: dest.join("build"),
            dest_src: dest.join("src"),
            dest_fonts: dest.join("fonts"),
            dest_static: dest.join("static"),
            dest_bower: dest.join("bower"),
        }
    }
}

#[derive(Debug)]
pub struct GenericBuilder {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    env: Arc<BuildEnv>,
    paths: BuilderPaths,
    label: String,
    layout: GenericLayout,
}

impl GenericBuilder {
    pub fn new(env: Arc<BuildEnv>, paths: BuilderPaths) -> Self {
        let label = builder_label(BuilderKind::Generic, &paths);
        let layout = GenericLayout::new(&paths);
        Self {
            shared: Arc::new(Shared {
                env,
                paths,
                label,
                layout,
            }),
        }
    }

    pub fn layout(&self) -> &GenericLayout {
        &self.shared.layout
    }
}

impl Builder for GenericBuilder {
    fn kind(&self) -> BuilderKind {
        BuilderKind::Generic
    }

    fn paths(&self) -> &BuilderPaths {
        &self.shared.paths
    }

    fn label(&self) -> String {
        self.shared.label.clone()
    }

    fn compile(&self, tasks: &mut TaskBatch) {
        let s = &self.shared;

        // The html rewrite must land after the plain copy of the same files.
        let (html_copied_tx, html_copied_rx) = watch::channel(false);
        tasks.push(signal_on_success(s.copy_html(), html_copied_tx));
        tasks.push(s.copy_static());
        if s.env.fs.exists(&s.layout.bower_json) {
            tasks.push(s.bower());
        }
        tasks.push(s.stylus(false));
        let rewrite = Arc::clone(s);
        tasks.push(
            s.build()
                .then(move || rewrite.replace_html(Some(html_copied_rx))),
        );
        tasks.push(s.font());
    }

    fn watch(&self, tasks: &mut TaskBatch) {
        let s = Arc::clone(&self.shared);
        tasks.push(run_as_task(&self.shared.label, "watch", move || {
            TaskOutput::future(s.start_watch())
        }));
    }
}

fn signal_on_success(task: TaskHandle, done: watch::Sender<bool>) -> TaskHandle {
    let (name, future) = task.into_parts();
    TaskHandle::new(name, async move {
        future.await?;
        done.send_replace(true);
        Ok(())
    })
}

impl Shared {
    fn copy_html(self: &Arc<Self>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "copyHtml", move || {
            let job = CopyJob::new(this.paths.src_dir(), HTML_GLOB, &this.layout.dest);
            TaskOutput::Stream(copy_files(
                Arc::clone(&this.env.fs),
                job,
                Some(this.env.livereload.clone()),
            ))
        })
    }

    fn copy_static(self: &Arc<Self>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "copyStatic", move || {
            let job = CopyJob::new(&this.layout.static_dir, "**/*.*", &this.layout.dest_static);
            TaskOutput::Stream(copy_files(
                Arc::clone(&this.env.fs),
                job,
                Some(this.env.livereload.clone()),
            ))
        })
    }

    fn font(self: &Arc<Self>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "font", move || {
            let job = CopyJob::new(&this.layout.fonts_dir, "*.*", &this.layout.dest_fonts);
            TaskOutput::Stream(copy_files(Arc::clone(&this.env.fs), job, None))
        })
    }

    /// Install, then extract main files.
    fn bower(self: &Arc<Self>) -> TaskHandle {
        let install = Arc::clone(self);
        let extract = Arc::clone(self);
        run_as_task(&self.label, "bowerInstall", move || {
            TaskOutput::future(async move {
                let root = install.paths.module_root().to_path_buf();
                install.env.toolchain.installer.install(root).await
            })
        })
        .then(move || {
            let label = extract.label.clone();
            run_as_task(&label, "mainBowerFiles", move || {
                TaskOutput::future(extract.extract_bower())
            })
        })
    }

    async fn extract_bower(self: Arc<Self>) -> Result<()> {
        let root = self.paths.module_root().to_path_buf();
        let bower_dest = self.layout.dest_bower.clone();
        let font_dest = self.layout.dest_fonts.clone();
        let assets = run_blocking(Arc::clone(&self.env.fs), move |fs| {
            bower::extract(fs, &root, &bower_dest, &font_dest)
        })
        .await?;
        if !assets.js.is_empty() {
            self.env
                .livereload
                .notify(self.layout.dest_bower.join("bower.js").to_string_lossy());
        }
        Ok(())
    }

    /// Compile every `css/*.styl` entry to `build/<src>/<name>.css`.
    fn stylus(self: &Arc<Self>, sourcemap: bool) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "stylus", move || {
            TaskOutput::future(this.compile_styles(sourcemap))
        })
    }

    async fn compile_styles(self: Arc<Self>, sourcemap: bool) -> Result<()> {
        let css_dir = self.layout.css_dir.clone();
        let entries = run_blocking(Arc::clone(&self.env.fs), move |fs| {
            let set = build_file_globset(&["*.styl".to_string()])?;
            collect_matching_files(fs, &css_dir, &set)
        })
        .await?;

        for entry in entries {
            let request = StyleRequest {
                entry: entry.clone(),
                include_paths: vec![self.layout.css_dir.clone(), self.paths.src_dir().to_path_buf()],
                compress: false,
                sourcemap,
            };
            let css = self.env.toolchain.style.compile(request).await?;

            let out = css_output(&self.layout.dest, &entry);
            write_file(&self.env, out.clone(), css).await?;
            self.env.livereload.notify(out.to_string_lossy());
        }
        Ok(())
    }

    fn bundle_request(&self, debug: bool) -> BundleRequest {
        let root = self.paths.module_root();
        BundleRequest {
            entry: self.layout.entry.clone(),
            module_root: root.to_path_buf(),
            node_paths: vec![root.join("node_modules")],
            debug,
        }
    }

    /// Bundle, minify, write `build/<src>/build/<minified>`.
    fn build(self: &Arc<Self>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "build", move || {
            TaskOutput::future(async move {
                let code = this.env.toolchain.bundler.bundle(this.bundle_request(false)).await?;
                let minified_name = this.paths.descriptor().minified_name().to_string();
                let request = MinifyRequest::new(minified_name.clone(), code);
                let minified = this.env.toolchain.minifier.minify(request).await?;
                write_file(&this.env, this.layout.dest_build.join(minified_name), minified).await
            })
        })
    }

    /// Rewrite `build:js` blocks of every source html into `build/<src>`.
    ///
    /// With a gate, waits until the plain html copy has finished.
    fn replace_html(self: &Arc<Self>, gate: Option<watch::Receiver<bool>>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "replaceHTML", move || {
            TaskOutput::future(async move {
                if let Some(mut copied) = gate {
                    copied
                        .wait_for(|done| *done)
                        .await
                        .map_err(|_| BuildError::Other(anyhow!("html copy did not complete")))?;
                }

                let script_src = format!("build/{}", this.paths.descriptor().minified_name());
                let src_dir = this.paths.src_dir().to_path_buf();
                let dest = this.layout.dest.clone();
                run_blocking(Arc::clone(&this.env.fs), move |fs| {
                    let set = build_file_globset(&[HTML_GLOB.to_string()])?;
                    for file in collect_matching_files(fs, &src_dir, &set)? {
                        let Ok(rel) = file.strip_prefix(&src_dir) else {
                            continue;
                        };
                        let html = fs.read_to_string(&file)?;
                        let rewritten = rewrite_build_blocks(&html, &script_src)?;
                        fs.write(&dest.join(rel), rewritten.as_bytes())?;
                        debug!(file = ?rel, "html rewritten");
                    }
                    Ok(())
                })
                .await
            })
        })
    }

    /// Development bundle to `build/<src>/src/<bundle>`, unminified.
    fn watch_bundle(self: &Arc<Self>) -> TaskHandle {
        let this = Arc::clone(self);
        run_as_task(&self.label, "bundle", move || {
            TaskOutput::future(async move {
                info!(builder = %this.label, "updating...");
                let code = this.env.toolchain.bundler.bundle(this.bundle_request(true)).await?;
                let out = this.layout.dest_src.join(this.paths.descriptor().bundle_name());
                write_file(&this.env, out.clone(), code).await?;
                this.env.livereload.notify(out.to_string_lossy());
                Ok(())
            })
        })
    }

    fn trigger_profiles(&self) -> Result<Vec<TriggerProfile>> {
        let src = Path::new(self.paths.src());
        let rooted = |pattern: &str| vec![rooted_pattern(src, pattern)];

        Ok(vec![
            TriggerProfile::new(TRIGGER_BOWER, &[bower::BOWER_JSON.to_string()], &[])?,
            TriggerProfile::new(TRIGGER_HTML, &rooted(HTML_GLOB), &[])?,
            TriggerProfile::new(TRIGGER_STATIC, &rooted("static/**/*"), &[])?,
            TriggerProfile::new(TRIGGER_STYLUS, &rooted("css/**/*"), &[])?,
            TriggerProfile::new(
                TRIGGER_BUNDLE,
                &[
                    rooted_pattern(src, "**/*.js"),
                    rooted_pattern(src, "**/*.jsx"),
                    rooted_pattern(src, "**/*.json"),
                ],
                &rooted("static/**"),
            )?,
        ])
    }

    fn route(self: &Arc<Self>, fired: &TriggerFired) -> Option<RebuildFactory> {
        let this = Arc::clone(self);
        let factory: RebuildFactory = match fired.trigger.as_str() {
            TRIGGER_BOWER => Box::new(move || this.bower()),
            TRIGGER_HTML => Box::new(move || this.copy_html()),
            TRIGGER_STATIC => Box::new(move || this.copy_static()),
            TRIGGER_STYLUS => Box::new(move || this.stylus(true)),
            TRIGGER_BUNDLE => Box::new(move || this.watch_bundle()),
            _ => return None,
        };
        Some(factory)
    }

    async fn start_watch(self: Arc<Self>) -> Result<()> {
        // Run the copy once so the development html is in place.
        self.copy_html().into_future().await?;

        let profiles = self.trigger_profiles()?;
        let (tx, rx) = mpsc::channel(TRIGGER_BUFFER);
        let guard = self
            .env
            .watch_backend
            .watch(self.paths.module_root(), profiles, tx)?;

        let queue = WatchQueue::new(self.label.clone(), self.env.cancel.clone());
        let initial = Arc::clone(&self);
        queue.enqueue(move || initial.watch_bundle());

        let router = Arc::clone(&self);
        queue.spawn_dispatcher(rx, guard, move |fired| router.route(fired));
        info!(builder = %self.label, "watching");
        Ok(())
    }
}

/// `css/main.styl` -> `<dest>/main.css`.
fn css_output(dest: &Path, entry: &Path) -> PathBuf {
    let stem = entry
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "style".to_string());
    dest.join(format!("{stem}.css"))
}

async fn write_file(env: &BuildEnv, path: PathBuf, contents: String) -> Result<()> {
    run_blocking(Arc::clone(&env.fs), move |fs| {
        fs.write(&path, contents.as_bytes())?;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::manifest::TargetDescriptor;

    #[test]
    fn layout_follows_build_conventions() {
        let fs = MockFileSystem::new();
        fs.add_dir("/m");
        let mut descriptor = TargetDescriptor::new("app");
        descriptor.entry = Some("main.js".into());
        let paths = BuilderPaths::new(&fs, Path::new("/m"), "m", descriptor).unwrap();

        let layout = GenericLayout::new(&paths);
        assert_eq!(layout.entry, PathBuf::from("/m/app/main.js"));
        assert_eq!(layout.bower_json, PathBuf::from("/m/bower.json"));
        assert_eq!(layout.dest_build, PathBuf::from("/m/build/app/build"));
        assert_eq!(layout.dest_src, PathBuf::from("/m/build/app/src"));
        assert_eq!(layout.dest_bower, PathBuf::from("/m/build/app/bower"));
        assert_eq!(layout.dest_fonts, PathBuf::from("/m/build/app/fonts"));
    }

    #[test]
    fn stylesheet_output_uses_entry_stem() {
        assert_eq!(
            css_output(Path::new("/m/build/app"), Path::new("/m/app/css/main.styl")),
            PathBuf::from("/m/build/app/main.css")
        );
    }
}
