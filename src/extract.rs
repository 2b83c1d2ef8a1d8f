use std::collections::{HashMap, HashSet};
use std::path::Path;

use lightningcss::css_modules::Config as CssModulesConfig;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use tracing::debug;

use crate::error::{GenerateError, Result};

/// Logical class names declared by one stylesheet, deduplicated.
///
/// Iteration follows the position of each name's first selector in the CSS
/// text (ties and names without a class selector fall back to lexical order),
/// so unchanged input always yields the same sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNameSet {
    names: Vec<String>,
}

impl ClassNameSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl FromIterator<String> for ClassNameSet {
    /// Keeps the first occurrence of each name, in input order.
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let names = iter
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();
        Self { names }
    }
}

/// Run `css` through the CSS Modules scoping engine and collect the local names.
///
/// `label` only identifies the stylesheet in diagnostics. The scoped names the
/// engine generates are discarded.
pub fn extract_class_names(css: &str, label: &Path) -> Result<ClassNameSet> {
    let filename = label.to_string_lossy().into_owned();
    let options = ParserOptions {
        filename: filename.clone(),
        // Keyframes and grid-line names are scoped too by default; only classes are wanted.
        css_modules: Some(CssModulesConfig {
            animation: false,
            grid: false,
            ..CssModulesConfig::default()
        }),
        ..ParserOptions::default()
    };

    let stylesheet = StyleSheet::parse(css, options).map_err(|err| GenerateError::Extraction {
        path: label.to_path_buf(),
        message: err.to_string(),
    })?;
    let printed = stylesheet
        .to_css(PrinterOptions::default())
        .map_err(|err| GenerateError::Extraction {
            path: label.to_path_buf(),
            message: err.to_string(),
        })?;

    let mut names: Vec<String> = printed
        .exports
        .map(|exports| exports.into_keys().collect())
        .unwrap_or_default();
    let offsets = first_selector_offsets(css);
    let offset = |name: &str| offsets.get(name).copied().unwrap_or(usize::MAX);
    names.sort_by(|a, b| offset(a).cmp(&offset(b)).then_with(|| a.cmp(b)));

    let set: ClassNameSet = names.into_iter().collect();
    debug!(file = %filename, classes = set.len(), "extracted class names");
    Ok(set)
}

/// Byte offset of the first `.name` occurrence of every name in `css`.
///
/// One pass: each `.` starts a name that runs over identifier characters, so
/// `.button--primary` never counts as an occurrence of `button`.
fn first_selector_offsets(css: &str) -> HashMap<&str, usize> {
    let is_name_char = |c: char| c.is_alphanumeric() || c == '-' || c == '_';
    let mut offsets = HashMap::new();
    let mut rest = css.char_indices().peekable();

    while let Some((start, c)) = rest.next() {
        if c != '.' {
            continue;
        }
        let mut end = start + 1;
        while let Some(&(index, next)) = rest.peek() {
            if !is_name_char(next) {
                break;
            }
            end = index + next.len_utf8();
            rest.next();
        }
        if end > start + 1 {
            offsets.entry(&css[start + 1..end]).or_insert(start);
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &ClassNameSet) -> Vec<&str> {
        set.iter().collect()
    }

    #[test]
    fn test_bem_modifiers_extracted_once() {
        let css = r#"
.container { display: flex; }
.button { color: red; }
.button--primary { color: blue; }
.button--secondary { color: gray; }
.container .button:hover { color: green; }
"#;
        let set = extract_class_names(css, Path::new("Button.module.scss")).unwrap();
        assert_eq!(
            names(&set),
            vec!["container", "button", "button--primary", "button--secondary"]
        );
    }

    #[test]
    fn test_no_classes_is_empty_set() {
        let set = extract_class_names("body { margin: 0; }", Path::new("reset.module.css")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_keyframes_are_not_class_names() {
        let css = "@keyframes fade { from { opacity: 0; } } .toast { animation: fade 1s; }";
        let set = extract_class_names(css, Path::new("toast.module.css")).unwrap();
        assert_eq!(names(&set), vec!["toast"]);
    }

    #[test]
    fn test_order_is_reproducible() {
        let css = ".zeta { top: 0; } .alpha { top: 1px; } .mid { top: 2px; } .alpha:focus { top: 3px; }";
        let first = extract_class_names(css, Path::new("a.module.css")).unwrap();
        for _ in 0..5 {
            let again = extract_class_names(css, Path::new("a.module.css")).unwrap();
            assert_eq!(first, again);
        }
        assert_eq!(names(&first), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_first_selector_offsets_respect_boundaries() {
        let css = ".button--primary {} .button {} .a.button {}";
        let offsets = first_selector_offsets(css);
        assert_eq!(offsets.get("button"), Some(&20));
        assert_eq!(offsets.get("button--primary"), Some(&0));
        assert_eq!(offsets.get("a"), Some(&31));
        assert_eq!(offsets.get("missing"), None);
    }

    fn utility_sheet(count: usize) -> String {
        (0..count)
            .map(|i| format!(".block-{i} {{ top: 0; }}\n.block-{i}--active {{ top: 1px; }}\n"))
            .collect()
    }

    #[test]
    fn test_first_selector_offsets_scale_linearly() {
        let css = utility_sheet(4000);
        let start = std::time::Instant::now();
        let offsets = first_selector_offsets(&css);
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(offsets.len(), 8000);
        assert_eq!(offsets.get("block-0"), Some(&0));
    }

    #[test]
    fn test_large_sheet_keeps_source_order() {
        let css = utility_sheet(1500);
        let set = extract_class_names(&css, Path::new("utilities.module.css")).unwrap();
        assert_eq!(set.len(), 3000);
        let expected: Vec<String> = (0..1500)
            .flat_map(|i| [format!("block-{i}"), format!("block-{i}--active")])
            .collect();
        assert!(set.iter().eq(expected.iter().map(String::as_str)));
    }

    #[test]
    fn test_from_iter_dedupes_in_first_seen_order() {
        let set: ClassNameSet = ["b", "a", "b", "c", "a"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names(&set), vec!["b", "a", "c"]);
        assert!(set.contains("c"));
    }
}
