//! The reflection engine: a cheap, cloneable handle that ties the source
//! cache, the symbol table, the configured locators, and the optional live
//! runtime together.
//!
//! Symbols are looked up in three steps:
//!
//! 1. the symbol table, fed by every file parsed so far,
//! 2. the configured [`SymbolLocator`],
//! 3. the file index of whatever file the locator pointed at.
//!
//! A miss at every step is reported as the kind-specific not-found error.

use std::path::Path;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{ReflectionError, Result};
use crate::evaluator::Evaluator;
use crate::index::{DeclRef, SymbolKind, SymbolTable};
use crate::inheritance::ClassDecl;
use crate::locator::{ChainLocator, ComposerLocator, ScanningLocator, SymbolLocator};
use crate::reflection::{ReflectionClass, ReflectionFile, ReflectionFunction};
use crate::runtime::{LiveBridge, LiveRuntime};
use crate::source_cache::{ParsedFile, SourceCache};
use crate::value::Value;

struct EngineInner {
    cache: Arc<SourceCache>,
    symbols: SymbolTable,
    locator: ChainLocator,
    bridge: Option<LiveBridge>,
    core_constants: bool,
}

/// Entry point of the library.
///
/// Cloning is cheap; clones share the cache, the symbol table, and the
/// runtime.
#[derive(Clone)]
pub struct ReflectionEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for ReflectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionEngine")
            .field("cached_files", &self.inner.cache.files().len())
            .field("locators", &self.inner.locator.len())
            .field("runtime", &self.inner.bridge.is_some())
            .finish()
    }
}

impl Default for ReflectionEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ReflectionEngine`].
pub struct EngineBuilder {
    cache: Option<Arc<SourceCache>>,
    locator: ChainLocator,
    runtime: Option<Arc<dyn LiveRuntime>>,
    core_constants: bool,
}

impl EngineBuilder {
    fn new() -> Self {
        Self {
            cache: None,
            locator: ChainLocator::new(),
            runtime: None,
            core_constants: true,
        }
    }

    /// Share an existing cache (e.g. one a scanning locator already filled).
    pub fn cache(mut self, cache: Arc<SourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Append a locator; locators are consulted in the order added.
    pub fn locator(mut self, locator: impl SymbolLocator + 'static) -> Self {
        self.locator.push(locator);
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn LiveRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn core_constants(mut self, enabled: bool) -> Self {
        self.core_constants = enabled;
        self
    }

    pub fn build(self) -> ReflectionEngine {
        ReflectionEngine {
            inner: Arc::new(EngineInner {
                cache: self.cache.unwrap_or_default(),
                symbols: SymbolTable::new(),
                locator: self.locator,
                bridge: self.runtime.map(LiveBridge::new),
                core_constants: self.core_constants,
            }),
        }
    }
}

impl ReflectionEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Build an engine from a configuration: Composer locator first (when a
    /// Composer root is configured), then the scanning locator.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::from_config_with_runtime(config, None)
    }

    pub fn from_config_with_runtime(
        config: &EngineConfig,
        runtime: Option<Arc<dyn LiveRuntime>>,
    ) -> Result<Self> {
        let cache = Arc::new(SourceCache::with_include_paths(config.include_paths.clone()));
        let mut builder = Self::builder()
            .cache(Arc::clone(&cache))
            .core_constants(config.core_constants);

        if let Some(root) = &config.composer_root {
            builder = builder.locator(ComposerLocator::new(root));
        }
        let mut scanned = Vec::new();
        if !config.scan_paths.is_empty() {
            let scanner = ScanningLocator::scan(&config.scan_paths, &cache);
            scanned = scanner.files().to_vec();
            builder = builder.locator(scanner);
        }
        if let Some(runtime) = runtime {
            builder = builder.runtime(runtime);
        }

        let engine = builder.build();
        // Everything the scan parsed is known without asking the locators,
        // recorded in walk order so duplicates resolve like the scan did.
        for path in &scanned {
            if let Some(file) = cache.get(path) {
                engine.inner.symbols.record(&file.path, &file.index);
            }
        }
        Ok(engine)
    }

    pub fn cache(&self) -> &SourceCache {
        &self.inner.cache
    }

    pub fn bridge(&self) -> Option<&LiveBridge> {
        self.inner.bridge.as_ref()
    }

    /// The attached runtime, or `NoRuntime` naming the operation.
    pub fn require_bridge(&self, operation: &str) -> Result<&LiveBridge> {
        self.bridge()
            .ok_or_else(|| ReflectionError::NoRuntime(operation.to_string()))
    }

    pub fn core_constants(&self) -> bool {
        self.inner.core_constants
    }

    /// Parse (or fetch) a file and make its symbols known.  A file's
    /// symbols are recorded the first time it is seen only.
    pub fn file(&self, path: &Path) -> Result<Arc<ParsedFile>> {
        let parsed = self.inner.cache.get_ast(path)?;
        self.inner.symbols.record(&parsed.path, &parsed.index);
        Ok(parsed)
    }

    /// Register in-memory source under `path` and make its symbols known.
    pub fn parse_source(&self, path: &Path, content: &str) -> Result<Arc<ParsedFile>> {
        let parsed = self.inner.cache.parse_source(path, content)?;
        self.inner.symbols.record(&parsed.path, &parsed.index);
        Ok(parsed)
    }

    fn locate(&self, kind: SymbolKind, fqn: &str) -> Option<(Arc<ParsedFile>, DeclRef)> {
        let fqn = fqn.trim_start_matches('\\');
        let path = self.inner.symbols.lookup(kind, fqn).or_else(|| match kind {
            SymbolKind::Class => self.inner.locator.locate(fqn),
            SymbolKind::Function => self.inner.locator.locate_function(fqn),
            SymbolKind::Constant => self.inner.locator.locate_constant(fqn),
        })?;

        let parsed = match self.file(&path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("{} was located in {}, but: {}", fqn, path.display(), err);
                return None;
            }
        };
        let decl = parsed.index.lookup(kind, fqn);
        if decl.is_none() {
            tracing::debug!("{} does not declare {}", path.display(), fqn);
        }
        decl.map(|decl| (parsed, decl))
    }

    pub fn locate_class(&self, fqn: &str) -> Result<ClassDecl> {
        self.locate(SymbolKind::Class, fqn)
            .map(|(file, decl)| ClassDecl::new(file, decl))
            .ok_or_else(|| ReflectionError::ClassNotFound(fqn.trim_start_matches('\\').to_string()))
    }

    pub fn locate_function(&self, fqn: &str) -> Result<(Arc<ParsedFile>, DeclRef)> {
        self.locate(SymbolKind::Function, fqn)
            .ok_or_else(|| ReflectionError::FunctionNotFound(fqn.trim_start_matches('\\').to_string()))
    }

    pub fn locate_constant(&self, fqn: &str) -> Result<(Arc<ParsedFile>, DeclRef)> {
        self.locate(SymbolKind::Constant, fqn)
            .ok_or_else(|| ReflectionError::ConstantNotFound(fqn.trim_start_matches('\\').to_string()))
    }

    pub fn class(&self, name: &str) -> Result<ReflectionClass> {
        ReflectionClass::new(self, name)
    }

    pub fn function(&self, name: &str) -> Result<ReflectionFunction> {
        ReflectionFunction::new(self, name)
    }

    pub fn reflect_file(&self, path: &Path) -> Result<ReflectionFile> {
        ReflectionFile::new(self, path)
    }

    /// Evaluate the global or namespaced constant `fqn`.
    pub fn constant_value(&self, fqn: &str) -> Result<Value> {
        Evaluator::new(self).global_constant(fqn)
    }
}
