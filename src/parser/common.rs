use crate::parser::ParseError;
use std::path::{Component, Path, PathBuf};
use tree_sitter::Node;

/// Macro to define a thread-local parser with a given language.
/// Usage: `define_parser!(PARSER_NAME, language_fn)`
#[macro_export]
macro_rules! define_parser {
    ($name:ident, $language:expr) => {
        thread_local! {
            static $name: std::cell::RefCell<tree_sitter::Parser> = std::cell::RefCell::new({
                let mut parser = tree_sitter::Parser::new();
                parser.set_language(&$language.into()).expect(concat!("Failed to set ", stringify!($name), " language"));
                parser
            });
        }
    };
}

/// UTF-8 first, Latin-1 when the bytes are not valid UTF-8.
pub fn decode_source(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s).to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<String> = Vec::new();
    let mut absolute = false;
    for component in path.components() {
        match component {
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if out.last().is_some_and(|c| c != "..") {
                    out.pop();
                } else if !absolute {
                    out.push("..".to_string());
                }
            }
            Component::Normal(part) => out.push(part.to_string_lossy().to_string()),
            Component::Prefix(p) => out.push(p.as_os_str().to_string_lossy().to_string()),
        }
    }
    let joined = out.join("/");
    if absolute {
        PathBuf::from(format!("/{}", joined))
    } else {
        PathBuf::from(joined)
    }
}

/// Directory of the importing file, `""` for files at the root.
pub fn importer_dir(file: &Path) -> PathBuf {
    file.parent().map(Path::to_path_buf).unwrap_or_default()
}

pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

pub fn start_line(node: &Node) -> usize {
    node.start_position().row + 1
}

pub fn end_line(node: &Node) -> usize {
    node.end_position().row + 1
}

/// Fail on the first ERROR or MISSING node, like a real compiler front-end would.
pub fn check_syntax(root: &Node) -> Result<(), ParseError> {
    if !root.has_error() {
        return Ok(());
    }
    match find_error(root) {
        Some(node) => {
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                "unexpected token".to_string()
            };
            Err(ParseError::Syntax {
                line: start_line(&node),
                message,
            })
        }
        None => Err(ParseError::Syntax {
            line: 1,
            message: "invalid syntax".to_string(),
        }),
    }
}

fn find_error<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = find_error(&child) {
                return Some(found);
            }
        }
    }
    None
}

/// `MAX_RETRIES`, `DEFAULT_TIMEOUT`: names that read as constants.
pub fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Strip quotes and prefixes from a string literal's source text.
pub fn unquote(text: &str) -> String {
    let trimmed = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

/// Collapse runs of whitespace so multi-line expressions compare equal as discriminant keys.
pub fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("src/app/../models/./user")),
            PathBuf::from("src/models/user")
        );
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
    }

    #[test]
    fn test_decode_source() {
        assert_eq!(decode_source("héllo".as_bytes()), "héllo");
        assert_eq!(decode_source(&[0x63, 0x61, 0x66, 0xE9]), "café");
        assert_eq!(decode_source("\u{feff}x = 1".as_bytes()), "x = 1");
    }

    #[test]
    fn test_constant_names() {
        assert!(is_constant_name("MAX_RETRIES"));
        assert!(is_constant_name("HTTP2_PORT"));
        assert!(!is_constant_name("maxRetries"));
        assert!(!is_constant_name("_"));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("f'x{y}'"), "x{y}");
        assert_eq!(unquote("\"\"\"doc\"\"\""), "doc");
        assert_eq!(unquote("`tpl`"), "tpl");
    }

    #[test]
    fn test_compact_collapses_whitespace() {
        assert_eq!(compact("order.\n        kind"), "order. kind");
        assert_eq!(compact("  a   b "), "a b");
    }
}
