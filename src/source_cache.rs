//! Parse-once cache of PHP source files.
//!
//! Every file is parsed at most once per process: the first request reads
//! and lowers it, later requests for the same canonical path return the
//! same `Arc<ParsedFile>`.  Entries are only removed by [`SourceCache::evict`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::error::{ReflectionError, Result};
use crate::index::{FileIndex, index_file};
use crate::parser;
use crate::types::FileAst;

/// One parsed source file.  Immutable once produced.
#[derive(Debug)]
pub struct ParsedFile {
    /// Canonical absolute path (or the registered path of an in-memory source).
    pub path: PathBuf,
    pub ast: FileAst,
    /// Declarations of `ast`, built right after the parse.
    pub index: FileIndex,
    pub parsed_at: SystemTime,
    /// Monotonically increasing parse id, unique within one cache.
    pub generation: u64,
}

/// Thread-safe, unbounded cache of parsed files keyed by canonical path.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: RwLock<HashMap<PathBuf, Arc<ParsedFile>>>,
    /// Directories searched for relative paths, before the current directory.
    include_paths: Vec<PathBuf>,
    next_generation: AtomicU64,
    parses: AtomicUsize,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_paths(include_paths: Vec<PathBuf>) -> Self {
        Self {
            include_paths,
            ..Self::default()
        }
    }

    /// Resolve a path the way PHP's `include` does: absolute paths are
    /// taken as-is, relative ones are tried against each include path and
    /// then the current directory.  The result is canonicalized.
    ///
    /// A path registered through [`SourceCache::parse_source`] resolves to
    /// its registered key even when nothing exists on disk.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        let io_err = |source| ReflectionError::Io {
            path: path.to_path_buf(),
            source,
        };

        let registered = absolute_key(path);
        if self.files.read().contains_key(&registered) {
            return Ok(registered);
        }

        if path.is_absolute() {
            return path.canonicalize().map_err(io_err);
        }

        for dir in &self.include_paths {
            let candidate = dir.join(path);
            if candidate.is_file() {
                return candidate.canonicalize().map_err(io_err);
            }
        }

        let cwd = std::env::current_dir().map_err(io_err)?;
        cwd.join(path).canonicalize().map_err(io_err)
    }

    /// Return the parsed tree for `path`, parsing the file on first request.
    pub fn get_ast(&self, path: &Path) -> Result<Arc<ParsedFile>> {
        let key = self.resolve_path(path)?;

        if let Some(file) = self.files.read().get(&key) {
            return Ok(Arc::clone(file));
        }

        let content = std::fs::read_to_string(&key).map_err(|source| ReflectionError::Io {
            path: key.clone(),
            source,
        })?;
        self.insert_parsed(key, &content)
    }

    /// Register an in-memory source under `path`.  If the path is already
    /// cached the existing entry is returned and `content` is ignored.
    pub fn parse_source(&self, path: &Path, content: &str) -> Result<Arc<ParsedFile>> {
        let key = path.canonicalize().unwrap_or_else(|_| absolute_key(path));

        if let Some(file) = self.files.read().get(&key) {
            return Ok(Arc::clone(file));
        }
        self.insert_parsed(key, content)
    }

    fn insert_parsed(&self, key: PathBuf, content: &str) -> Result<Arc<ParsedFile>> {
        tracing::debug!("parsing {}", key.display());
        let ast = parser::parse_source(&key, content)?;
        self.parses.fetch_add(1, Ordering::Relaxed);

        let index = index_file(&ast);
        let parsed = Arc::new(ParsedFile {
            path: key.clone(),
            ast,
            index,
            parsed_at: SystemTime::now(),
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
        });

        // A racing parse of the same file may have landed first; keep it so
        // that every caller sees one entry per path.
        let mut files = self.files.write();
        let entry = files.entry(key).or_insert(parsed);
        Ok(Arc::clone(entry))
    }

    /// The cached entry for an already-resolved path, without parsing.
    pub fn get(&self, path: &Path) -> Option<Arc<ParsedFile>> {
        self.files.read().get(path).cloned()
    }

    /// Remove one entry.  Returns `true` when something was evicted.
    pub fn evict(&self, path: &Path) -> bool {
        let key = path.canonicalize().unwrap_or_else(|_| absolute_key(path));
        self.files.write().remove(&key).is_some()
    }

    /// Number of parses performed so far (cache misses).
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    /// Snapshot of every cached file.
    pub fn files(&self) -> Vec<Arc<ParsedFile>> {
        self.files.read().values().cloned().collect()
    }
}

/// The key of a path that cannot be canonicalized: absolute as given,
/// relative joined onto the current directory.
fn absolute_key(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_requests_do_not_reparse() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.php");
        std::fs::write(&file, "<?php\nclass A {}\n").unwrap();

        let cache = SourceCache::new();
        let first = cache.get_ast(&file).unwrap();
        let second = cache.get_ast(&file).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.parse_count(), 1);
        assert_eq!(first.ast.namespaces[0].classes[0].name, "A");
    }

    #[test]
    fn relative_paths_use_include_paths_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/B.php"), "<?php\nclass B {}\n").unwrap();

        let cache = SourceCache::with_include_paths(vec![dir.path().join("lib")]);
        let parsed = cache.get_ast(Path::new("B.php")).unwrap();
        assert!(parsed.path.ends_with("lib/B.php"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let cache = SourceCache::new();
        let err = cache
            .get_ast(Path::new("/definitely/not/here.php"))
            .unwrap_err();
        assert!(matches!(err, ReflectionError::Io { .. }));
    }

    #[test]
    fn syntax_errors_are_not_cached() {
        let cache = SourceCache::new();
        let path = Path::new("/virtual/broken.php");
        assert!(cache.parse_source(path, "<?php\nclass {").is_err());
        assert!(cache.get(path).is_none());
    }

    #[test]
    fn in_memory_sources_are_found_by_their_registered_path() {
        let cache = SourceCache::new();
        let path = Path::new("/virtual/mem.php");
        let registered = cache.parse_source(path, "<?php\nclass Mem {}\n").unwrap();

        assert_eq!(cache.resolve_path(path).unwrap(), PathBuf::from("/virtual/mem.php"));
        let fetched = cache.get_ast(path).unwrap();
        assert!(Arc::ptr_eq(&registered, &fetched));
        assert_eq!(cache.parse_count(), 1);

        assert!(cache.evict(path));
        assert!(matches!(
            cache.get_ast(path),
            Err(ReflectionError::Io { .. })
        ));
    }

    #[test]
    fn evict_forces_a_reparse() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("C.php");
        std::fs::write(&file, "<?php\nclass C {}\n").unwrap();

        let cache = SourceCache::new();
        let first = cache.get_ast(&file).unwrap();
        assert!(cache.evict(&file));
        let second = cache.get_ast(&file).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.generation > first.generation);
        assert_eq!(first.ast, second.ast);
        assert_eq!(cache.parse_count(), 2);
    }
}
