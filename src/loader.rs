use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GenerateError, Result};

/// Extensions handed to the Sass compiler instead of being read verbatim.
const PREPROCESSOR_EXTENSIONS: &[&str] = &["scss", "sass"];

/// Returns true if `path` has to go through the preprocessor before extraction.
pub fn needs_preprocessing(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    PREPROCESSOR_EXTENSIONS.contains(&ext)
}

/// Resolve a stylesheet to flat CSS text.
///
/// `.scss`/`.sass` files are compiled with `grass` on the blocking pool; anything
/// else is read from disk as UTF-8. Nothing is cached, so the result always
/// reflects the file as it is on disk right now.
pub async fn load_css(path: &Path) -> Result<String> {
    if needs_preprocessing(path) {
        debug!(path = %path.display(), "compiling with preprocessor");
        let owned: PathBuf = path.to_path_buf();
        return tokio::task::spawn_blocking(move || compile_sass(&owned))
            .await
            .map_err(|err| GenerateError::Compile {
                path: path.to_path_buf(),
                message: format!("compiler task failed: {err}"),
            })?;
    }

    debug!(path = %path.display(), "reading plain css");
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| GenerateError::Load {
            path: path.to_path_buf(),
            source,
        })
}

fn compile_sass(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(GenerateError::Load {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    grass::from_path(path, &grass::Options::default()).map_err(|err| GenerateError::Compile {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
