use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{GenerateError, Result};

/// Project file looked up in the working directory.
pub const CONFIG_FILE: &str = "css-modules-dts.toml";

/// Structural form of the generated declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportShape {
    /// Object type, key union and a single default export.
    #[default]
    Default,
    /// One standalone constant per class name.
    Named,
    /// The default block followed by the standalone constants.
    Both,
}

/// Identifier-rendering rule applied to each logical class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum NameConvention {
    /// `button--primary` becomes `buttonPrimary`.
    #[default]
    #[value(name = "camelCase", alias = "camel-case")]
    #[serde(rename = "camelCase", alias = "camel-case")]
    CamelCase,
    /// Always a quoted key holding the logical name verbatim.
    #[value(name = "dashes")]
    #[serde(rename = "dashes")]
    Dashes,
    /// The logical name, quoted only when it is not a valid identifier.
    #[value(name = "original")]
    #[serde(rename = "original")]
    Original,
}

/// Where declaration artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Next to the source file, with `.d.ts` appended.
    #[default]
    Auto,
    /// Mirrored under this directory, relative to the working directory.
    Directory(PathBuf),
}

impl OutputMode {
    /// Parse the user-facing `output` value: `auto` or a directory path.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(GenerateError::Config(
                "output must be \"auto\" or a directory path".to_string(),
            ));
        }
        if trimmed == "auto" {
            Ok(Self::Auto)
        } else {
            Ok(Self::Directory(PathBuf::from(trimmed)))
        }
    }
}

/// Optional settings read from `css-modules-dts.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct ProjectConfig {
    pub output: Option<String>,
    pub export_type: Option<ExportShape>,
    pub name_format: Option<NameConvention>,
    pub debug: Option<bool>,
    /// Additional path patterns to skip during discovery and watching.
    pub exclude: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Load configuration from `css-modules-dts.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        // Logging is not initialised yet; the debug flag may come from this file.
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("warning: failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

/// The per-file part of the configuration: everything but the pattern and the mode flags.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output: OutputMode,
    pub export_shape: ExportShape,
    pub name_convention: NameConvention,
    /// Absolute working directory that relative paths are resolved against.
    pub root: PathBuf,
}

/// Fully-resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub pattern: String,
    pub output: OutputMode,
    pub watch: bool,
    pub export_shape: ExportShape,
    pub name_convention: NameConvention,
    pub debug: bool,
    pub exclude: Vec<String>,
    pub root: PathBuf,
}

impl GeneratorConfig {
    /// Configuration with every option at its default.
    pub fn new(pattern: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            output: OutputMode::Auto,
            watch: false,
            export_shape: ExportShape::default(),
            name_convention: NameConvention::default(),
            debug: false,
            exclude: Vec::new(),
            root: root.into(),
        }
    }

    /// Merge command-line flags over the project file over the built-in defaults.
    pub fn resolve(cli: &Cli, project: ProjectConfig, root: PathBuf) -> Result<Self> {
        if cli.pattern.trim().is_empty() {
            return Err(GenerateError::Config("pattern must not be empty".to_string()));
        }

        let output = match cli.output.as_deref().or(project.output.as_deref()) {
            Some(value) => OutputMode::parse(value)?,
            None => OutputMode::Auto,
        };

        Ok(Self {
            pattern: cli.pattern.clone(),
            output,
            watch: cli.watch,
            export_shape: cli.export_type.or(project.export_type).unwrap_or_default(),
            name_convention: cli.name_format.or(project.name_format).unwrap_or_default(),
            debug: cli.debug || project.debug.unwrap_or(false),
            exclude: project.exclude.unwrap_or_default(),
            root,
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            output: self.output.clone(),
            export_shape: self.export_shape,
            name_convention: self.name_convention,
            root: self.root.clone(),
        }
    }
}
