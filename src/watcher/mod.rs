pub mod event;
pub mod session;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::{PollWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, Debouncer, new_debouncer_opt};
use regex::Regex;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::discovery::{anchor_pattern, is_excluded};
use crate::emit::DECLARATION_SUFFIX;
use crate::error::{GenerateError, Result};

use event::WatchEvent;

/// How often the polling watcher rescans the watched directories.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A file must be quiet this long before its change is dispatched.
pub const STABILITY_WINDOW: Duration = Duration::from_millis(300);

/// Directory names never worth watching: caches, VCS data and build output.
const EXCLUDED_DIRS: &[&str] = &["node_modules", ".sass-cache", ".git", "dist", "build"];

/// Handle to a running watcher. Keeps the debouncer alive (dropping stops watching).
pub struct WatcherHandle {
    /// Keep alive: dropping the debouncer stops the poller.
    _debouncer: Debouncer<PollWatcher>,
    /// The bridge task forwarding events from std channel to tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// Decides which filesystem paths are module stylesheets worth regenerating.
#[derive(Debug)]
pub struct RelevanceFilter {
    root: PathBuf,
    module_file: Regex,
    /// The user's pattern anchored at `root`; ancestor directories watched for
    /// inference may hold module files the batch pass would never select.
    selection: glob::Pattern,
    gitignore: Gitignore,
    exclude: Vec<String>,
}

/// `*` must not cross directories, matching how `glob::glob` walks.
const SELECTION_MATCH: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl RelevanceFilter {
    pub fn new(root: &Path, pattern: &str, exclude: Vec<String>) -> Result<Self> {
        let module_file = Regex::new(r"\.module\.(css|scss|sass)$")
            .map_err(|err| GenerateError::Config(err.to_string()))?;
        let selection = glob::Pattern::new(&anchor_pattern(pattern, root)).map_err(|err| {
            GenerateError::Discovery {
                pattern: pattern.to_string(),
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            module_file,
            selection,
            gitignore: build_gitignore_matcher(root),
            exclude,
        })
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        self.rejection(path).is_none()
    }

    /// Why `path` is ignored, or `None` if it should be processed.
    ///
    /// Filtering order:
    /// 1. Our own `.d.ts` output (never feeds back into the watcher)
    /// 2. Hardcoded directory exclusions (caches, build output)
    /// 3. Configured `exclude` patterns
    /// 4. `.gitignore` rules from the working directory
    /// 5. The module stylesheet name pattern
    /// 6. The user's glob pattern
    pub fn rejection(&self, path: &Path) -> Option<&'static str> {
        let text = path.to_string_lossy();
        if text.ends_with(DECLARATION_SUFFIX) {
            return Some("generated declaration");
        }
        if path
            .components()
            .any(|c| EXCLUDED_DIRS.iter().any(|d| c.as_os_str() == *d))
        {
            return Some("excluded directory");
        }
        if is_excluded(path, &self.exclude) {
            return Some("excluded by configuration");
        }
        // The parent walk panics for paths outside the matcher's root.
        if path.starts_with(&self.root)
            && self
                .gitignore
                .matched_path_or_any_parents(path, path.is_dir())
                .is_ignore()
        {
            return Some("gitignored");
        }
        if !self.module_file.is_match(&text) {
            return Some("not a module stylesheet");
        }
        if !self.selection.matches_path_with(path, SELECTION_MATCH) {
            return Some("outside pattern");
        }
        None
    }
}

/// Build a Gitignore matcher from the working directory's .gitignore file.
/// If no .gitignore exists, returns an empty matcher that matches nothing.
fn build_gitignore_matcher(root: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(root);
    let gitignore_path = root.join(".gitignore");
    if gitignore_path.exists()
        && let Some(err) = builder.add(&gitignore_path)
    {
        warn!("ignoring unreadable .gitignore: {err}");
    }
    builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Start a polling, debounced watcher over `directories` (non-recursively).
///
/// Returns a `WatcherHandle` (must be kept alive) and a tokio mpsc receiver
/// that yields one classified batch per debounce window. Paths rejected by
/// `filter` never reach the receiver.
pub fn start_watcher(
    directories: &BTreeSet<PathBuf>,
    filter: Arc<RelevanceFilter>,
) -> Result<(WatcherHandle, tokio_mpsc::Receiver<Vec<WatchEvent>>)> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let notify_config = notify::Config::default()
        .with_poll_interval(POLL_INTERVAL)
        .with_compare_contents(true);
    let debouncer_config = notify_debouncer_mini::Config::default()
        .with_timeout(STABILITY_WINDOW)
        .with_notify_config(notify_config);

    let mut debouncer = new_debouncer_opt::<_, PollWatcher>(
        debouncer_config,
        move |res: DebounceEventResult| {
            let _ = std_tx.send(res);
        },
    )
    .map_err(|err| GenerateError::Watcher(err.to_string()))?;

    for dir in directories {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|err| GenerateError::Watcher(format!("{}: {err}", dir.display())))?;
    }

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<Vec<WatchEvent>>(64);

    // Bridge: spawn_blocking to receive from std channel, classify, forward to tokio
    let bridge_task = tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            let batch = classify_batch(result, &filter);
            if batch.is_empty() {
                continue;
            }
            if tokio_tx.blocking_send(batch).is_err() {
                return; // receiver dropped, shutdown
            }
        }
    });

    Ok((
        WatcherHandle {
            _debouncer: debouncer,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}

fn classify_batch(result: DebounceEventResult, filter: &RelevanceFilter) -> Vec<WatchEvent> {
    match result {
        // `AnyContinuous` fires while a path is still changing; only a settled
        // `Any` means the file has been stable for a whole window.
        Ok(events) => events
            .into_iter()
            .filter(|debounced| debounced.kind == DebouncedEventKind::Any)
            .filter_map(|debounced| classify_event(debounced.path, filter))
            .collect(),
        Err(err) => vec![WatchEvent::Error(err.to_string())],
    }
}

/// Classify a filesystem event path into a WatchEvent, or None if it should be ignored.
fn classify_event(path: PathBuf, filter: &RelevanceFilter) -> Option<WatchEvent> {
    if let Some(reason) = filter.rejection(&path) {
        debug!(path = %path.display(), reason, "ignoring event");
        return None;
    }

    // The poller doesn't tell creation from modification; existence separates
    // upserts from removals.
    if path.exists() {
        Some(WatchEvent::Changed(path))
    } else {
        Some(WatchEvent::Removed(path))
    }
}
