//! Filesystem access and source discovery.
//!
//! Discovery walks the project once and hands the core an ordered list of
//! `SourceFile`s; nothing past this module touches the disk for sources.

use crate::model::{Language, SourceFile, glob_match};
use crate::parser::ParserRegistry;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Trait for filesystem operations, enabling dependency injection and testing.
pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write content to a file, creating it if it doesn't exist.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// Real filesystem implementation using std::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

pub fn default_fs() -> &'static RealFs {
    static INSTANCE: RealFs = RealFs;
    &INSTANCE
}

/// Project-relative path with forward slashes, as matched against globs.
fn relative_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

fn is_excluded(relative: &Path, exclude: &[String]) -> bool {
    let path_str = relative.to_string_lossy();
    exclude.iter().any(|pattern| glob_match(pattern, &path_str))
}

/// List every parseable source under `root`, honoring `.gitignore` and the
/// configured exclude globs. Paths come back relative to `root`, sorted.
pub fn discover_sources(
    root: &Path,
    registry: &ParserRegistry,
    exclude: &[String],
    fs: &dyn FileSystem,
) -> Vec<SourceFile> {
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build();

    let mut sources = Vec::new();
    for entry in walker.flatten() {
        let file_path = entry.path();
        if !file_path.is_file() || registry.find_parser(file_path).is_none() {
            continue;
        }
        let Some(language) = Language::from_path(file_path) else {
            continue;
        };

        let relative = relative_path(root, file_path);
        if is_excluded(&relative, exclude) {
            debug!(file = %relative.display(), "excluded");
            continue;
        }

        match fs.read(file_path) {
            Ok(content) => sources.push(SourceFile::new(relative, language, content)),
            Err(e) => warn!(file = %file_path.display(), error = %e, "could not read source"),
        }
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    sources
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// In-memory filesystem for testing.
    #[derive(Debug, Default)]
    pub struct MockFs {
        files: RwLock<HashMap<String, String>>,
    }

    impl MockFs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn files(&self) -> HashMap<String, String> {
            self.files.read().unwrap().clone()
        }
    }

    impl FileSystem for MockFs {
        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            let key = path.to_string_lossy().to_string();
            self.files
                .read()
                .unwrap()
                .get(&key)
                .map(|c| c.clone().into_bytes())
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, format!("file not found: {}", key))
                })
        }

        fn write(&self, path: &Path, content: &str) -> io::Result<()> {
            let key = path.to_string_lossy().to_string();
            self.files.write().unwrap().insert(key, content.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            let key = path.to_string_lossy().to_string();
            self.files.read().unwrap().contains_key(&key)
        }
    }

    #[test]
    fn test_mock_fs_read_write() {
        let fs = MockFs::new();
        let path = Path::new("/test/report.md");
        assert!(!fs.exists(path));
        assert!(fs.read(path).is_err());

        fs.write(path, "# Report").unwrap();
        assert!(fs.exists(path));
        assert_eq!(fs.read(path).unwrap(), b"# Report");
        assert_eq!(fs.files().len(), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/services")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        std::fs::write(root.join("src/services/b.ts"), "export const b = 2;\n").unwrap();
        std::fs::write(root.join("src/a.py"), "a = 1\n").unwrap();
        std::fs::write(root.join("README.md"), "# readme\n").unwrap();
        std::fs::write(root.join("node_modules/lib/index.js"), "module.exports = {};\n").unwrap();

        let sources = discover_sources(
            root,
            &ParserRegistry::new(),
            &["**/node_modules/**".to_string()],
            default_fs(),
        );
        let paths: Vec<_> = sources.iter().map(|s| s.path.clone()).collect();

        assert_eq!(
            paths,
            vec![PathBuf::from("src/a.py"), PathBuf::from("src/services/b.ts")]
        );
        assert_eq!(sources[0].language, Language::Python);
    }
}
