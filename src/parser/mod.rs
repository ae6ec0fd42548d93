mod common;
mod python;
mod typescript;

use crate::model::{Language, ParseResult, ParsedFile, SourceFile};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub use common::{decode_source, normalize_path};
pub use python::PythonParser;
pub use typescript::TypeScriptParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("File is {bytes} bytes, above the {limit} byte limit")]
    TooLarge { bytes: usize, limit: usize },
    #[error("Grammar could not be loaded: {0}")]
    Grammar(String),
    #[error("Unsupported language for file: {0}")]
    UnsupportedLanguage(String),
}

impl ParseError {
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;
    fn extensions(&self) -> &[&str];
    fn parse_source(&self, path: &Path, source: &str) -> Result<ParseResult, ParseError>;
}

pub struct ParserRegistry {
    parsers: Vec<Box<dyn LanguageParser>>,
    max_file_bytes: usize,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(PythonParser::new()),
                Box::new(TypeScriptParser::new()),
            ],
            max_file_bytes: usize::MAX,
        }
    }

    pub fn with_languages(languages: &[String]) -> Self {
        let mut parsers: Vec<Box<dyn LanguageParser>> = Vec::new();

        for lang in languages {
            match lang.to_lowercase().as_str() {
                "typescript" | "ts" | "javascript" | "js" => {
                    if !parsers.iter().any(|p| p.language() == Language::TypeScript) {
                        parsers.push(Box::new(TypeScriptParser::new()))
                    }
                }
                "python" | "py" => {
                    if !parsers.iter().any(|p| p.language() == Language::Python) {
                        parsers.push(Box::new(PythonParser::new()))
                    }
                }
                _ => {}
            }
        }

        if parsers.is_empty() {
            return Self::new();
        }

        Self {
            parsers,
            max_file_bytes: usize::MAX,
        }
    }

    /// Files above this size are recorded as parse failures instead of parsed.
    #[must_use]
    pub fn with_max_file_bytes(mut self, limit: usize) -> Self {
        self.max_file_bytes = limit;
        self
    }

    pub fn find_parser(&self, path: &Path) -> Option<&dyn LanguageParser> {
        let ext = path.extension()?.to_str()?;
        self.parsers
            .iter()
            .find(|p| p.extensions().contains(&ext))
            .map(|p| p.as_ref())
    }

    /// Extension first, then the file's language tag (JavaScript is handled by
    /// the TypeScript grammar).
    fn parser_for(&self, file: &SourceFile) -> Option<&dyn LanguageParser> {
        let wanted = match file.language {
            Language::JavaScript => Language::TypeScript,
            other => other,
        };
        self.find_parser(&file.path).or_else(|| {
            self.parsers
                .iter()
                .find(|p| p.language() == wanted)
                .map(|p| p.as_ref())
        })
    }

    /// Parse one file. Never fails: errors come back as a failed `ParseResult`.
    pub fn parse(&self, file: &SourceFile) -> ParsedFile {
        let text = decode_source(&file.content);
        let result = match self.try_parse(file, &text) {
            Ok(result) => {
                debug!(
                    file = %file.path.display(),
                    classes = result.classes.len(),
                    functions = result.functions.len(),
                    imports = result.imports.len(),
                    "parsed"
                );
                result
            }
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "parse failed");
                ParseResult::failed(file.path.clone(), file.language, e.to_string(), e.line())
            }
        };
        ParsedFile { result, text }
    }

    fn try_parse(&self, file: &SourceFile, text: &str) -> Result<ParseResult, ParseError> {
        if file.content.len() > self.max_file_bytes {
            return Err(ParseError::TooLarge {
                bytes: file.content.len(),
                limit: self.max_file_bytes,
            });
        }

        let parser = self
            .parser_for(file)
            .ok_or_else(|| ParseError::UnsupportedLanguage(file.path.display().to_string()))?;

        let mut result = parser.parse_source(&file.path, text)?;
        result.language = file.language;
        Ok(result)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_parser_by_extension() {
        let registry = ParserRegistry::new();
        assert!(registry.find_parser(Path::new("a.py")).is_some());
        assert!(registry.find_parser(Path::new("a.tsx")).is_some());
        assert!(registry.find_parser(Path::new("a.mjs")).is_some());
        assert!(registry.find_parser(Path::new("a.rs")).is_none());
    }

    #[test]
    fn test_with_languages_filters() {
        let registry = ParserRegistry::with_languages(&["python".to_string()]);
        assert!(registry.find_parser(Path::new("a.py")).is_some());
        assert!(registry.find_parser(Path::new("a.ts")).is_none());
    }

    #[test]
    fn test_syntax_error_becomes_failed_result() {
        let registry = ParserRegistry::new();
        let file = SourceFile::new("bad.py", Language::Python, "def broken(:\n    pass\n");
        let parsed = registry.parse(&file);
        assert!(!parsed.result.parse_succeeded);
        assert!(parsed.result.error.is_some());
    }

    #[test]
    fn test_oversized_file_is_skipped() {
        let registry = ParserRegistry::new().with_max_file_bytes(10);
        let file = SourceFile::new("big.py", Language::Python, "x = 1\n".repeat(10));
        let parsed = registry.parse(&file);
        assert!(!parsed.result.parse_succeeded);
        assert!(parsed.result.error.unwrap().contains("limit"));
    }

    #[test]
    fn test_latin1_fallback() {
        let registry = ParserRegistry::new();
        // "café" in Latin-1: 0xE9 is not valid UTF-8 on its own
        let mut content = b"name = 'caf".to_vec();
        content.push(0xE9);
        content.extend_from_slice(b"'\n");
        let parsed = registry.parse(&SourceFile::new("latin.py", Language::Python, content));
        assert!(parsed.result.parse_succeeded);
        assert!(parsed.text.contains("café"));
    }
}
