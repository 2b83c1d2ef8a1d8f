use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by every pipeline stage.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Everything that can go wrong while generating declarations.
///
/// `Discovery` and `Config` are fatal for a run. Every other variant names a
/// single source file and is caught at that file's boundary.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The glob pattern could not be resolved to a file list.
    #[error("failed to resolve pattern '{pattern}': {message}")]
    Discovery { pattern: String, message: String },

    /// The stylesheet could not be read as UTF-8 text.
    #[error("failed to read {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The preprocessor rejected the stylesheet.
    #[error("failed to compile {path}: {message}")]
    Compile { path: PathBuf, message: String },

    /// The scoping engine could not process the compiled CSS.
    #[error("failed to extract class names from {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filesystem observer reported a fault.
    #[error("watcher error: {0}")]
    Watcher(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GenerateError {
    /// Source path this error is attributed to, if it is a per-file error.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Load { path, .. }
            | Self::Compile { path, .. }
            | Self::Extraction { path, .. }
            | Self::CreateDir { path, .. }
            | Self::Write { path, .. }
            | Self::Remove { path, .. } => Some(path),
            Self::Discovery { .. } | Self::Watcher(_) | Self::Config(_) => None,
        }
    }

    /// True for errors that abort the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Discovery { .. } | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_errors_carry_path() {
        let err = GenerateError::Compile {
            path: PathBuf::from("a.module.scss"),
            message: "expected \"}\"".to_string(),
        };
        assert_eq!(err.path(), Some(&PathBuf::from("a.module.scss")));
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("a.module.scss"));
    }

    #[test]
    fn test_discovery_is_fatal() {
        let err = GenerateError::Discovery {
            pattern: "src/[".to_string(),
            message: "invalid range pattern".to_string(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.path(), None);
    }
}
