use std::path::PathBuf;

/// Internal watch event types after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A relevant stylesheet exists after the change (created or modified).
    Changed(PathBuf),
    /// A relevant stylesheet is gone.
    Removed(PathBuf),
    /// The observer reported a fault; the session keeps running.
    Error(String),
}

