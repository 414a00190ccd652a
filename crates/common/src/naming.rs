//! Identifier derivation
//!
//! Turns arbitrary UTF-8 names from a document (schema keys, property names,
//! operation ids) into identifiers that are valid in any mainstream target
//! language. The escaping is deterministic and reversible:
//!
//! - ASCII letters and digits are kept (a leading digit is escaped)
//! - `_` is doubled
//! - every other character becomes `_hh` for each of its UTF-8 bytes
//! - a reserved word gets a single trailing `_`

use std::collections::BTreeSet;

/// Reserved words shared by the usual client targets
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "const", "continue", "crate",
    "def", "del", "elif", "else", "enum", "except", "extern", "false", "False", "finally", "fn",
    "for", "from", "global", "if", "impl", "import", "in", "is", "lambda", "let", "loop",
    "match", "mod", "move", "mut", "None", "nonlocal", "not", "or", "pass", "pub", "raise",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "True", "try",
    "type", "unsafe", "use", "where", "while", "with", "yield",
];

/// Escape `name` into an identifier, suffixing reserved words
///
/// # Example
/// ```
/// use clientgen_common::naming::{escape_identifier, unescape_identifier, DEFAULT_KEYWORDS};
/// use std::collections::BTreeSet;
///
/// let keywords: BTreeSet<String> = DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect();
/// assert_eq!(escape_identifier("class", &keywords), "class_");
/// assert_eq!(escape_identifier("x-rate", &keywords), "x_2drate");
/// assert_eq!(unescape_identifier("x_2drate").as_deref(), Some("x-rate"));
/// ```
pub fn escape_identifier(name: &str, keywords: &BTreeSet<String>) -> String {
    let mut out = String::with_capacity(name.len());
    let mut buf = [0u8; 4];

    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_alphanumeric() && !(i == 0 && ch.is_ascii_digit()) {
            out.push(ch);
        } else if ch == '_' {
            out.push_str("__");
        } else {
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("_{byte:02x}"));
            }
        }
    }

    if out.is_empty() || keywords.contains(&out) {
        out.push('_');
    }
    out
}

/// Recover the original name from an escaped identifier
///
/// Returns `None` when `ident` is not the output of [`escape_identifier`].
pub fn unescape_identifier(ident: &str) -> Option<String> {
    let bytes = ident.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'_' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            // keyword suffix
            None => i += 1,
            Some(b'_') => {
                out.push(b'_');
                i += 2;
            }
            Some(_) => {
                let hex = ident.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
        }
    }

    String::from_utf8(out).ok()
}

/// Convert snake_case, kebab-case or dotted names to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    s.split(['_', '-', ' ', '.'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
