//! Parse-result cache keyed by `(file_path, sha256(content))`.
//!
//! The pipeline reads the cache while parsing and writes each miss once
//! afterwards, so implementations only need interior mutability for `put`.

use crate::model::ParseResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

pub const CACHE_FILE: &str = ".archaudit-cache.json";

/// Bumped whenever `ParseResult` changes shape.
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to access cache file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode cache: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

pub trait ParseCache: Send + Sync {
    fn get(&self, path: &Path, hash: &str) -> Option<ParseResult>;
    fn put(&self, path: &Path, hash: &str, result: &ParseResult);
}

/// Always misses.
pub struct NoCache;

impl ParseCache for NoCache {
    fn get(&self, _path: &Path, _hash: &str) -> Option<ParseResult> {
        None
    }

    fn put(&self, _path: &Path, _hash: &str, _result: &ParseResult) {}
}

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<PathBuf, (String, ParseResult)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ParseCache for MemoryCache {
    fn get(&self, path: &Path, hash: &str) -> Option<ParseResult> {
        let entries = self.entries.read().ok()?;
        entries
            .get(path)
            .filter(|(stored, _)| stored == hash)
            .map(|(_, result)| result.clone())
    }

    fn put(&self, path: &Path, hash: &str, result: &ParseResult) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(path.to_path_buf(), (hash.to_string(), result.clone()));
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    entries: Vec<CacheEntry>,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    file_path: PathBuf,
    hash: String,
    result: ParseResult,
}

/// A `MemoryCache` persisted as one JSON document between runs.
pub struct JsonFileCache {
    path: PathBuf,
    inner: MemoryCache,
}

impl JsonFileCache {
    /// Load the cache file. A missing, stale or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let inner = MemoryCache::new();

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<CacheDocument>(&content) {
                Ok(doc) if doc.version == CACHE_VERSION => {
                    for entry in doc.entries {
                        inner.put(&entry.file_path, &entry.hash, &entry.result);
                    }
                    debug!(path = %path.display(), entries = inner.len(), "loaded parse cache");
                }
                Ok(doc) => {
                    debug!(found = doc.version, expected = CACHE_VERSION, "discarding stale parse cache");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring corrupt parse cache"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "could not read parse cache"),
        }

        Self { path, inner }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn flush(&self) -> Result<(), CacheError> {
        let mut entries: Vec<CacheEntry> = match self.inner.entries.read() {
            Ok(map) => map
                .iter()
                .map(|(file_path, (hash, result))| CacheEntry {
                    file_path: file_path.clone(),
                    hash: hash.clone(),
                    result: result.clone(),
                })
                .collect(),
            Err(_) => return Ok(()),
        };
        entries.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        let doc = CacheDocument {
            version: CACHE_VERSION,
            entries,
        };
        std::fs::write(&self.path, serde_json::to_string(&doc)?)?;
        Ok(())
    }
}

impl ParseCache for JsonFileCache {
    fn get(&self, path: &Path, hash: &str) -> Option<ParseResult> {
        self.inner.get(path, hash)
    }

    fn put(&self, path: &Path, hash: &str, result: &ParseResult) {
        self.inner.put(path, hash, result)
    }
}
