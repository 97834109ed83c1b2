//! Symbol locators: fully-qualified name → declaring file, without loading
//! the file.
//!
//! The engine consults its [`crate::index::SymbolTable`] first and only
//! asks the locator for symbols declared in files it has not parsed yet.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;

use crate::composer::ComposerAutoload;
use crate::index::{SymbolKind, SymbolTable};
use crate::source_cache::SourceCache;

/// Strategy that maps a fully-qualified symbol name to its file.
///
/// `locate` covers class-likes (the autoloadable symbols).  Functions and
/// constants are only locatable by strategies that have seen their
/// declaration, so their methods default to `None`.
pub trait SymbolLocator: Send + Sync {
    fn locate(&self, fqn: &str) -> Option<PathBuf>;

    fn locate_function(&self, _fqn: &str) -> Option<PathBuf> {
        None
    }

    fn locate_constant(&self, _fqn: &str) -> Option<PathBuf> {
        None
    }
}

impl<L: SymbolLocator + ?Sized> SymbolLocator for Arc<L> {
    fn locate(&self, fqn: &str) -> Option<PathBuf> {
        (**self).locate(fqn)
    }

    fn locate_function(&self, fqn: &str) -> Option<PathBuf> {
        (**self).locate_function(fqn)
    }

    fn locate_constant(&self, fqn: &str) -> Option<PathBuf> {
        (**self).locate_constant(fqn)
    }
}

/// An explicit, case-insensitive class map.
#[derive(Debug, Clone, Default)]
pub struct ClassMapLocator {
    map: HashMap<String, PathBuf>,
}

impl ClassMapLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fqn: &str, path: impl Into<PathBuf>) {
        self.map.insert(
            fqn.trim_start_matches('\\').to_ascii_lowercase(),
            path.into(),
        );
    }

    pub fn with(mut self, fqn: &str, path: impl Into<PathBuf>) -> Self {
        self.insert(fqn, path);
        self
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl SymbolLocator for ClassMapLocator {
    fn locate(&self, fqn: &str) -> Option<PathBuf> {
        self.map
            .get(&fqn.trim_start_matches('\\').to_ascii_lowercase())
            .cloned()
    }
}

impl<S: AsRef<str>, P: Into<PathBuf>> FromIterator<(S, P)> for ClassMapLocator {
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        let mut locator = Self::new();
        for (fqn, path) in iter {
            locator.insert(fqn.as_ref(), path);
        }
        locator
    }
}

/// Composer's classmap plus PSR-4 mappings.
#[derive(Debug, Clone)]
pub struct ComposerLocator {
    autoload: ComposerAutoload,
}

impl ComposerLocator {
    pub fn new(root: &Path) -> Self {
        Self {
            autoload: ComposerAutoload::load(root),
        }
    }

    pub fn from_autoload(autoload: ComposerAutoload) -> Self {
        Self { autoload }
    }
}

impl SymbolLocator for ComposerLocator {
    fn locate(&self, fqn: &str) -> Option<PathBuf> {
        let found = self.autoload.resolve(fqn);
        tracing::debug!("composer lookup {} -> {:?}", fqn, found);
        found
    }
}

/// Walks directory trees, parses every `.php` file through the shared
/// source cache, and records each declared symbol.
///
/// Files that fail to parse are skipped with a warning.
#[derive(Debug, Default)]
pub struct ScanningLocator {
    symbols: SymbolTable,
    /// Parsed files in walk order (sorted by path within each root).
    files: Vec<PathBuf>,
}

impl ScanningLocator {
    pub fn scan(roots: &[PathBuf], cache: &SourceCache) -> Self {
        let mut locator = Self::default();
        for root in roots {
            let walker = WalkBuilder::new(root)
                .hidden(false)
                .git_ignore(true)
                .parents(false)
                .sort_by_file_path(|a, b| a.cmp(b))
                .build();

            for entry in walker.flatten() {
                let path = entry.path();
                let is_php = entry.file_type().is_some_and(|ft| ft.is_file())
                    && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("php"));
                if !is_php {
                    continue;
                }
                match cache.get_ast(path) {
                    Ok(parsed) => {
                        if locator.symbols.record(&parsed.path, &parsed.index) {
                            locator.files.push(parsed.path.clone());
                        }
                    }
                    Err(err) => tracing::warn!("skipping {}: {}", path.display(), err),
                }
            }
        }
        tracing::debug!("scanned {} PHP files", locator.files.len());
        locator
    }

    pub fn files_scanned(&self) -> usize {
        self.files.len()
    }

    /// Every parsed file, in the order the walk reached it.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl SymbolLocator for ScanningLocator {
    fn locate(&self, fqn: &str) -> Option<PathBuf> {
        self.symbols.lookup(SymbolKind::Class, fqn)
    }

    fn locate_function(&self, fqn: &str) -> Option<PathBuf> {
        self.symbols.lookup(SymbolKind::Function, fqn)
    }

    fn locate_constant(&self, fqn: &str) -> Option<PathBuf> {
        self.symbols.lookup(SymbolKind::Constant, fqn)
    }
}

/// Tries several strategies in order; the first hit wins.
#[derive(Default)]
pub struct ChainLocator {
    locators: Vec<Box<dyn SymbolLocator>>,
}

impl ChainLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, locator: impl SymbolLocator + 'static) {
        self.locators.push(Box::new(locator));
    }

    pub fn with(mut self, locator: impl SymbolLocator + 'static) -> Self {
        self.push(locator);
        self
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl SymbolLocator for ChainLocator {
    fn locate(&self, fqn: &str) -> Option<PathBuf> {
        self.locators.iter().find_map(|l| l.locate(fqn))
    }

    fn locate_function(&self, fqn: &str) -> Option<PathBuf> {
        self.locators.iter().find_map(|l| l.locate_function(fqn))
    }

    fn locate_constant(&self, fqn: &str) -> Option<PathBuf> {
        self.locators.iter().find_map(|l| l.locate_constant(fqn))
    }
}
