use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{GeneratorConfig, PipelineOptions};
use crate::discovery::discover;
use crate::emit::{DeclarationArtifact, artifact_path, render, write_artifact};
use crate::error::Result;
use crate::extract::extract_class_names;
use crate::loader::load_css;
use crate::naming::FormattedName;

/// Outcome of one full generation pass.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files returned by discovery, in discovery order.
    pub discovered: Vec<PathBuf>,
    /// Artifact paths written, in discovery order of their sources.
    pub written: Vec<PathBuf>,
    /// Sources that failed, with the rendered cause.
    pub failed: Vec<(PathBuf, String)>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Discover every file matching the pattern and generate its declarations.
///
/// Files are processed concurrently and independently: a failing file is
/// logged and recorded in the report, never aborting its siblings. Only a
/// discovery failure is returned as an error.
pub async fn generate(config: &GeneratorConfig) -> Result<BatchReport> {
    let start = Instant::now();
    let files = discover(config)?;

    if files.is_empty() {
        warn!(pattern = %config.pattern, "no files matched");
    } else {
        info!("Found {} stylesheet(s)", files.len());
    }

    let options = Arc::new(config.pipeline_options());
    let mut tasks = JoinSet::new();
    for (index, path) in files.iter().cloned().enumerate() {
        let options = Arc::clone(&options);
        tasks.spawn(async move {
            let outcome = process_single_file(&path, &options).await;
            (index, path, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(files.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => error!("generation task failed: {err}"),
        }
    }
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut report = BatchReport {
        discovered: files,
        ..BatchReport::default()
    };
    for (_, path, outcome) in outcomes {
        match outcome {
            Ok(artifact) => report.written.push(artifact),
            Err(err) => report.failed.push((path, err.to_string())),
        }
    }
    report.elapsed = start.elapsed();
    Ok(report)
}

/// Run load, extract, format and emit for exactly one stylesheet.
///
/// Errors are logged here with the offending path and then returned, so both
/// the batch driver and the watch session can account for them.
pub async fn process_single_file(path: &Path, options: &PipelineOptions) -> Result<PathBuf> {
    match run_pipeline(path, options).await {
        Ok(written) => {
            info!("Generated {}", written.display());
            Ok(written)
        }
        Err(err) => {
            error!("{err}");
            Err(err)
        }
    }
}

async fn run_pipeline(path: &Path, options: &PipelineOptions) -> Result<PathBuf> {
    let css = load_css(path).await?;
    debug!(path = %path.display(), bytes = css.len(), "loaded");

    let classes = extract_class_names(&css, path)?;
    if classes.is_empty() {
        debug!(path = %path.display(), "no class names, emitting index signature");
    } else {
        debug!(path = %path.display(), classes = classes.len(), "extracted");
    }

    let names: Vec<FormattedName> = classes
        .iter()
        .map(|name| FormattedName::new(name, options.name_convention))
        .collect();
    debug!(path = %path.display(), names = names.len(), convention = ?options.name_convention, "formatted");

    let artifact = DeclarationArtifact {
        path: artifact_for(path, options),
        content: render(&names, options.export_shape),
    };
    debug!(path = %artifact.path.display(), shape = ?options.export_shape, "emitting");
    write_artifact(&artifact).await?;
    Ok(artifact.path)
}

/// Absolute form of `path`, anchored at `root` when relative.
pub fn absolutize(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Where the artifact for `source` lives, for deletion on unlink.
pub fn artifact_for(source: &Path, options: &PipelineOptions) -> PathBuf {
    options
        .root
        .join(artifact_path(source, &options.output, &options.root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportShape, NameConvention, OutputMode};
    use std::fs;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let styles = dir.path().join("styles");
        fs::create_dir_all(&styles).unwrap();
        fs::write(
            styles.join("Button.module.scss"),
            ".container { display: flex; }\n.button {\n  color: red;\n  &--primary { color: blue; }\n  &--secondary { color: gray; }\n}\n",
        )
        .unwrap();
        fs::write(styles.join("card.module.css"), ".card-title { top: 0; }\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_generate_writes_artifacts_next_to_sources() {
        let dir = setup();
        let config = GeneratorConfig::new("styles/*.module.*", dir.path());

        let report = generate(&config).await.unwrap();

        assert_eq!(report.discovered.len(), 2);
        assert!(!report.has_failures());
        let button = fs::read_to_string(dir.path().join("styles/Button.module.scss.d.ts")).unwrap();
        for key in ["container", "button", "buttonPrimary", "buttonSecondary"] {
            assert!(button.contains(&format!("  readonly {key}: string;")), "{button}");
        }
        let card = fs::read_to_string(dir.path().join("styles/card.module.css.d.ts")).unwrap();
        assert!(card.contains("readonly cardTitle: string;"));
    }

    #[tokio::test]
    async fn test_generate_is_idempotent() {
        let dir = setup();
        let mut config = GeneratorConfig::new("styles/*.module.*", dir.path());
        config.export_shape = ExportShape::Both;

        generate(&config).await.unwrap();
        let artifact = dir.path().join("styles/Button.module.scss.d.ts");
        let first = fs::read(&artifact).unwrap();
        generate(&config).await.unwrap();
        let second = fs::read(&artifact).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_generate_output_directory_mirrors_layout() {
        let dir = setup();
        let mut config = GeneratorConfig::new("styles/*.module.css", dir.path());
        config.output = OutputMode::Directory(PathBuf::from("types"));
        config.name_convention = NameConvention::Dashes;

        let report = generate(&config).await.unwrap();

        let expected = dir.path().join("types/styles/card.module.css.d.ts");
        assert_eq!(report.written, vec![expected.clone()]);
        assert!(fs::read_to_string(expected).unwrap().contains("readonly 'card-title': string;"));
        assert!(!dir.path().join("styles/card.module.css.d.ts").exists());
    }

    #[tokio::test]
    async fn test_one_broken_file_does_not_block_others() {
        let dir = setup();
        fs::write(
            dir.path().join("styles/broken.module.scss"),
            ".broken { color: red;\n",
        )
        .unwrap();
        let config = GeneratorConfig::new("styles/*.module.*", dir.path());

        let report = generate(&config).await.unwrap();

        assert_eq!(report.discovered.len(), 3);
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("broken.module.scss"));
        assert!(dir.path().join("styles/Button.module.scss.d.ts").exists());
        assert!(dir.path().join("styles/card.module.css.d.ts").exists());
        assert!(!dir.path().join("styles/broken.module.scss.d.ts").exists());
    }

    #[tokio::test]
    async fn test_discovery_failure_propagates() {
        let dir = setup();
        let config = GeneratorConfig::new("styles/[", dir.path());
        assert!(generate(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_process_single_file_empty_stylesheet() {
        let dir = setup();
        let source = dir.path().join("styles/reset.module.css");
        fs::write(&source, "html { margin: 0; }\n").unwrap();
        let config = GeneratorConfig::new("unused", dir.path());

        let written = process_single_file(&source, &config.pipeline_options())
            .await
            .unwrap();

        let text = fs::read_to_string(written).unwrap();
        assert!(text.contains("readonly [key: string]: string;"));
    }

    #[test]
    fn test_artifact_for_is_absolute() {
        let config = GeneratorConfig::new("unused", "/project");
        let path = artifact_for(Path::new("src/a.module.css"), &config.pipeline_options());
        assert_eq!(path, PathBuf::from("/project/src/a.module.css.d.ts"));
        assert_eq!(
            absolutize(Path::new("src/a.module.css"), Path::new("/project")),
            PathBuf::from("/project/src/a.module.css")
        );
    }
}
