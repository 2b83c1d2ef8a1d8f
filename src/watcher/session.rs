use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::batch::{BatchReport, absolutize, artifact_for, generate, process_single_file};
use crate::config::{GeneratorConfig, PipelineOptions};
use crate::emit::remove_artifact;
use crate::error::{GenerateError, Result};

use super::event::WatchEvent;
use super::{RelevanceFilter, WatcherHandle, start_watcher};

/// Lifecycle of a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    /// Initial batch pass and directory inference.
    Seeding,
    /// The poller is attached and events are being handled.
    Active,
    Stopped,
}

/// Everything watch mode owns for the lifetime of the process.
///
/// The directory set only grows during seeding. Directories created after the
/// watcher attaches are not picked up until the next start.
pub struct WatchSession {
    config: GeneratorConfig,
    options: Arc<PipelineOptions>,
    state: WatchState,
    directories: BTreeSet<PathBuf>,
    filter: Arc<RelevanceFilter>,
    /// Sources seen so far, used to tell additions from changes in logs.
    known: HashSet<PathBuf>,
}

impl WatchSession {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let filter = RelevanceFilter::new(&config.root, &config.pattern, config.exclude.clone())?;
        Ok(Self {
            options: Arc::new(config.pipeline_options()),
            config,
            state: WatchState::Idle,
            directories: BTreeSet::new(),
            filter: Arc::new(filter),
            known: HashSet::new(),
        })
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn directories(&self) -> &BTreeSet<PathBuf> {
        &self.directories
    }

    /// Run one full batch pass and infer the directories to observe.
    ///
    /// Discovery failures are fatal and leave the session in `Seeding`.
    pub async fn seed(&mut self) -> Result<BatchReport> {
        self.state = WatchState::Seeding;
        let report = generate(&self.config).await?;

        self.directories =
            infer_directories(&report.discovered, &self.config.pattern, &self.config.root);
        self.known = report.discovered.iter().cloned().collect();
        for dir in &self.directories {
            debug!(dir = %dir.display(), "watching");
        }
        Ok(report)
    }

    /// Attach the poller to the inferred directory set.
    ///
    /// The poller snapshots every watched directory while attaching and only
    /// reports differences from that snapshot, so writes made before this call
    /// (including the seeding pass's own output) never produce events.
    pub fn attach(&mut self) -> Result<(WatcherHandle, tokio_mpsc::Receiver<Vec<WatchEvent>>)> {
        let (handle, rx) = start_watcher(&self.directories, Arc::clone(&self.filter))?;
        self.state = WatchState::Active;
        Ok((handle, rx))
    }

    /// Dispatch one debounced batch and wait for every dispatch to finish.
    ///
    /// A batch holds at most one event per path, so a path is never processed
    /// twice at once; different paths run concurrently.
    pub async fn handle_batch(&mut self, events: Vec<WatchEvent>) {
        let mut tasks = JoinSet::new();

        for event in events {
            match event {
                WatchEvent::Changed(path) => {
                    let path = absolutize(&path, &self.config.root);
                    if self.known.insert(path.clone()) {
                        info!("Added {}", path.display());
                    } else {
                        info!("Changed {}", path.display());
                    }
                    let options = Arc::clone(&self.options);
                    tasks.spawn(async move {
                        // Failures are logged inside the pipeline.
                        let _ = process_single_file(&path, &options).await;
                    });
                }
                WatchEvent::Removed(path) => {
                    let path = absolutize(&path, &self.config.root);
                    self.known.remove(&path);
                    let artifact = artifact_for(&path, &self.options);
                    tasks.spawn(async move {
                        match remove_artifact(&artifact).await {
                            Ok(true) => info!("Removed {}", artifact.display()),
                            Ok(false) => debug!(path = %artifact.display(), "no artifact to remove"),
                            Err(err) => error!("{err}"),
                        }
                    });
                }
                WatchEvent::Error(message) => {
                    error!("{}", GenerateError::Watcher(message));
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!("watch task failed: {err}");
            }
        }
    }

    pub fn stop(&mut self) {
        self.state = WatchState::Stopped;
    }

    /// Seed, attach and handle events until Ctrl-C or SIGTERM.
    pub async fn run(mut self) -> Result<()> {
        let mut shutdown = ShutdownSignal::install();
        let report = self.seed().await?;
        info!(
            "Generated {} declaration file(s), {} failed",
            report.written.len(),
            report.failed.len()
        );

        let (handle, mut rx) = self.attach()?;
        info!(
            "Watching {} director(ies) for changes (Ctrl-C to stop)",
            self.directories().len()
        );

        loop {
            tokio::select! {
                batch = rx.recv() => match batch {
                    Some(events) => self.handle_batch(events).await,
                    None => {
                        warn!("watcher channel closed");
                        break;
                    }
                },
                () = shutdown.recv() => {
                    info!("Stopping watch mode");
                    break;
                }
            }
        }

        self.stop();
        drop(handle);
        Ok(())
    }
}

/// Ctrl-C, plus SIGTERM on unix.
///
/// Handlers are registered at install time so a signal that arrives while
/// seeding still ends the session cleanly.
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignal {
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let terminate = match signal(SignalKind::terminate()) {
                Ok(stream) => Some(stream),
                Err(err) => {
                    warn!("cannot listen for SIGTERM: {err}");
                    None
                }
            };
            Self { terminate }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        match self.terminate.as_mut() {
            Some(terminate) => {
                tokio::select! {
                    _ = terminate.recv() => {}
                    () = ctrl_c() => {}
                }
            }
            None => ctrl_c().await,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

/// Directories to observe: each file's directory plus its ancestors.
///
/// Ancestors never climb above `root`. When the pattern starts with a literal
/// segment (`src/**/*.css` gives `src`), only ancestors whose path contains it
/// are kept, which keeps unrelated trees out of the set.
pub fn infer_directories(files: &[PathBuf], pattern: &str, root: &Path) -> BTreeSet<PathBuf> {
    let scope = scope_segment(pattern);
    let mut directories = BTreeSet::new();

    for file in files {
        let file = absolutize(file, root);
        let Some(dir) = file.parent() else {
            continue;
        };
        directories.insert(dir.to_path_buf());

        for ancestor in dir.ancestors().skip(1) {
            if !ancestor.starts_with(root) {
                break;
            }
            let in_scope = scope.is_none_or(|s| ancestor.to_string_lossy().contains(s));
            if in_scope {
                directories.insert(ancestor.to_path_buf());
            }
        }
    }

    directories
}

/// First path segment of the pattern, when it is a literal directory name.
fn scope_segment(pattern: &str) -> Option<&str> {
    let first = pattern.trim_start_matches("./").split('/').next()?;
    let is_literal = !first.is_empty()
        && first != "."
        && first != ".."
        && !first.contains(['*', '?', '[', ']', '{', '}']);
    is_literal.then_some(first)
}
