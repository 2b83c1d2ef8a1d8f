use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::config::{ExportShape, OutputMode};
use crate::error::{GenerateError, Result};
use crate::naming::FormattedName;

/// Suffix appended to the full source file name.
pub const DECLARATION_SUFFIX: &str = ".d.ts";

const HEADER: &str = "// This file is automatically generated. Do not edit.\n";

/// Identifier-shaped names that cannot be bound with `const`.
const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield", "let", "static",
    "implements", "interface", "package", "private", "protected", "public", "await",
];

/// Generated text plus the path it belongs at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationArtifact {
    pub path: PathBuf,
    pub content: String,
}

/// Render the declaration text for one stylesheet.
pub fn render(names: &[FormattedName], shape: ExportShape) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    match shape {
        ExportShape::Default => render_default(&mut out, names),
        ExportShape::Named => render_named(&mut out, names),
        ExportShape::Both => {
            render_default(&mut out, names);
            if !names.is_empty() {
                out.push('\n');
                render_named(&mut out, names);
            }
        }
    }
    out
}

fn render_default(out: &mut String, names: &[FormattedName]) {
    out.push_str("declare const styles: {\n");
    if names.is_empty() {
        out.push_str("  readonly [key: string]: string;\n");
    }
    for name in names {
        let _ = writeln!(out, "  readonly {}: string;", name.rendered);
    }
    out.push_str("};\n");
    out.push_str("export type ClassNames = keyof typeof styles;\n");
    out.push_str("export default styles;\n");
}

/// One export per name. Names that cannot be a `const` binding (quoted keys,
/// reserved words, the `styles` object) get a private binding exported under
/// the name itself, e.g. `export { _0 as 'card-title' };`.
fn render_named(out: &mut String, names: &[FormattedName]) {
    if names.is_empty() {
        out.push_str("export {};\n");
        return;
    }

    let mut taken: HashSet<&str> = names.iter().map(|n| n.rendered.as_str()).collect();
    taken.insert("styles");

    for (index, name) in names.iter().enumerate() {
        if name.is_identifier() && !is_unbindable(&name.rendered) {
            let _ = writeln!(out, "export declare const {}: string;", name.rendered);
            continue;
        }
        let local = local_binding(index, &taken);
        debug!(class = %name.logical, binding = %local, "exporting through an alias");
        let _ = writeln!(out, "declare const {local}: string;");
        let _ = writeln!(out, "export {{ {local} as {} }};", name.rendered);
    }
}

fn is_unbindable(name: &str) -> bool {
    name == "styles" || RESERVED_WORDS.contains(&name)
}

fn local_binding(index: usize, taken: &HashSet<&str>) -> String {
    let mut local = format!("_{index}");
    while taken.contains(local.as_str()) {
        local.insert(0, '_');
    }
    local
}

/// Compute where the artifact for `source` goes.
///
/// `Auto` appends `.d.ts` in place. `Directory(dir)` mirrors the source's path
/// relative to `root` under `dir`.
pub fn artifact_path(source: &Path, output: &OutputMode, root: &Path) -> PathBuf {
    match output {
        OutputMode::Auto => with_suffix(source),
        OutputMode::Directory(dir) => with_suffix(&dir.join(relative_to(source, root))),
    }
}

fn with_suffix(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(DECLARATION_SUFFIX);
    PathBuf::from(raw)
}

/// `path` relative to `root`; absolute paths outside `root` lose their prefix.
fn relative_to(path: &Path, root: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(root) {
        return stripped.to_path_buf();
    }
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// Write the artifact, creating parent directories and replacing any existing file.
pub async fn write_artifact(artifact: &DeclarationArtifact) -> Result<()> {
    if let Some(parent) = artifact.path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| GenerateError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(&artifact.path, artifact.content.as_bytes())
        .await
        .map_err(|source| GenerateError::Write {
            path: artifact.path.clone(),
            source,
        })
}

/// Delete an artifact; a file that is already gone is not an error.
pub async fn remove_artifact(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(GenerateError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
