use crate::config::NameConvention;

/// A logical class name paired with the token it is emitted as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedName {
    pub logical: String,
    pub rendered: String,
}

impl FormattedName {
    pub fn new(logical: &str, convention: NameConvention) -> Self {
        Self {
            logical: logical.to_string(),
            rendered: format_name(logical, convention),
        }
    }

    /// True when `rendered` is a bare identifier rather than a quoted key.
    pub fn is_identifier(&self) -> bool {
        is_valid_identifier(&self.rendered)
    }
}

/// Render `name` as an object key under `convention`.
///
/// The result is either a bare identifier or a single-quoted string literal.
pub fn format_name(name: &str, convention: NameConvention) -> String {
    match convention {
        NameConvention::Original => key_or_quoted(name),
        NameConvention::Dashes => quote(name),
        NameConvention::CamelCase => key_or_quoted(&camel_case(name)),
    }
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn key_or_quoted(name: &str) -> String {
    if is_valid_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn quote(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Split on runs of `-`/`_` and join the segments in camelCase.
///
/// Names with no segments at all (e.g. `---`) are returned unchanged.
fn camel_case(name: &str) -> String {
    let segments: Vec<&str> = name
        .split(['-', '_'])
        .filter(|segment| !segment.is_empty())
        .collect();

    let Some((first, rest)) = segments.split_first() else {
        return name.to_string();
    };

    let mut out = if is_shouty(first) {
        first.to_lowercase()
    } else {
        lower_first(first)
    };
    for segment in rest {
        let mut chars = segment.chars();
        if let Some(head) = chars.next() {
            out.extend(head.to_uppercase());
            if is_shouty(segment) {
                out.push_str(&chars.as_str().to_lowercase());
            } else {
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// Entirely upper-case letters, digits and underscores.
fn is_shouty(segment: &str) -> bool {
    segment
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn lower_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(head) => head.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
