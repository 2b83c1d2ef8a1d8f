use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::error::{GenerateError, Result};

/// Stylesheet extensions the pipeline understands.
pub const STYLESHEET_EXTENSIONS: &[&str] = &["css", "scss", "sass"];

/// Resolve the configured glob pattern to an ordered list of stylesheet paths.
///
/// Relative patterns are anchored at `config.root`. Directories, files without
/// a stylesheet extension and paths matching `config.exclude` are dropped.
/// Unreadable entries are skipped with a warning; an invalid pattern is a
/// fatal `Discovery` error.
pub fn discover(config: &GeneratorConfig) -> Result<Vec<PathBuf>> {
    let anchored = anchor_pattern(&config.pattern, &config.root);
    let entries = glob::glob(&anchored).map_err(|err| GenerateError::Discovery {
        pattern: config.pattern.clone(),
        message: err.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };

        if !path.is_file() {
            continue;
        }

        // Also keeps our own `.d.ts` output out of broad patterns like `*.module.*`.
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !STYLESHEET_EXTENSIONS.contains(&ext) {
            continue;
        }

        if is_excluded(&path, &config.exclude) {
            debug!(path = %path.display(), "excluded by configuration");
            continue;
        }

        debug!(path = %path.display(), "discovered");
        files.push(path);
    }

    Ok(files)
}

pub fn anchor_pattern(pattern: &str, root: &Path) -> String {
    if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
        root.join(trimmed).to_string_lossy().into_owned()
    }
}

/// Returns true if `path` matches any exclusion pattern.
///
/// Each pattern is tried against the whole path and against every component.
pub fn is_excluded(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();

    for pattern in patterns {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            continue;
        };
        if matcher.matches(&path_str) {
            return true;
        }
        for component in path.components() {
            if let Some(s) = component.as_os_str().to_str()
                && matcher.matches(s)
            {
                return true;
            }
        }
    }

    false
}
