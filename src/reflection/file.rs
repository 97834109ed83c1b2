use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::engine::ReflectionEngine;
use crate::error::Result;
use crate::evaluator::{Scope, try_evaluate};
use crate::index::{DeclRef, constant_key, symbol_key};
use crate::inheritance::ClassDecl;
use crate::resolution::NamespaceContext;
use crate::source_cache::ParsedFile;
use crate::types::{NamespaceNode, qualify};
use crate::value::Value;

use super::{ReflectionClass, ReflectionFunction};

/// A parsed source file.
pub struct ReflectionFile {
    engine: ReflectionEngine,
    file: Arc<ParsedFile>,
}

impl ReflectionFile {
    /// Parse `path` (through the engine's cache) and reflect it.
    pub fn new(engine: &ReflectionEngine, path: &Path) -> Result<Self> {
        let file = engine.file(path)?;
        Ok(Self {
            engine: engine.clone(),
            file,
        })
    }

    pub fn name(&self) -> &Path {
        &self.file.path
    }

    /// Every namespace block, in source order.
    pub fn namespaces(&self) -> Vec<ReflectionFileNamespace> {
        (0..self.file.ast.namespaces.len())
            .map(|index| ReflectionFileNamespace {
                engine: self.engine.clone(),
                file: Arc::clone(&self.file),
                index,
            })
            .collect()
    }

    /// The block declaring namespace `name` (`""` for the global one).
    pub fn namespace(&self, name: &str) -> Option<ReflectionFileNamespace> {
        let name = name.trim_matches('\\');
        self.namespaces()
            .into_iter()
            .find(|ns| ns.name().eq_ignore_ascii_case(name))
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespace(name).is_some()
    }

    /// `declare(strict_types=1)` at the top of the file.
    pub fn is_strict_mode(&self) -> bool {
        self.file.ast.strict_types
    }
}

impl fmt::Debug for ReflectionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionFile")
            .field("name", &self.file.path)
            .field("namespaces", &self.file.ast.namespaces.len())
            .finish()
    }
}

/// One namespace block of a file.
pub struct ReflectionFileNamespace {
    engine: ReflectionEngine,
    file: Arc<ParsedFile>,
    index: usize,
}

impl ReflectionFileNamespace {
    fn node(&self) -> &NamespaceNode {
        &self.file.ast.namespaces[self.index]
    }

    fn decl(&self, index: usize) -> DeclRef {
        DeclRef {
            namespace: self.index,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.node().name
    }

    pub fn file_name(&self) -> &Path {
        &self.file.path
    }

    pub fn doc_comment(&self) -> Option<&str> {
        self.node().doc_comment.as_deref()
    }

    pub fn start_line(&self) -> u32 {
        self.node().lines.start
    }

    pub fn end_line(&self) -> u32 {
        self.node().lines.end
    }

    pub fn classes(&self) -> Vec<ReflectionClass> {
        (0..self.node().classes.len())
            .map(|i| {
                let decl = ClassDecl::new(Arc::clone(&self.file), self.decl(i));
                ReflectionClass::from_decl(&self.engine, decl)
            })
            .collect()
    }

    /// Class-like declared in this block, by fully-qualified name.
    pub fn class(&self, name: &str) -> Option<ReflectionClass> {
        let wanted = symbol_key(name);
        let position = self
            .node()
            .classes
            .iter()
            .rposition(|c| symbol_key(&qualify(self.name(), &c.name)) == wanted)?;
        let decl = ClassDecl::new(Arc::clone(&self.file), self.decl(position));
        Some(ReflectionClass::from_decl(&self.engine, decl))
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.class(name).is_some()
    }

    pub fn functions(&self) -> Vec<ReflectionFunction> {
        (0..self.node().functions.len())
            .map(|i| ReflectionFunction::from_decl(&self.engine, Arc::clone(&self.file), self.decl(i)))
            .collect()
    }

    pub fn function(&self, name: &str) -> Option<ReflectionFunction> {
        let wanted = symbol_key(name);
        let position = self
            .node()
            .functions
            .iter()
            .rposition(|f| symbol_key(&qualify(self.name(), &f.name)) == wanted)?;
        Some(ReflectionFunction::from_decl(
            &self.engine,
            Arc::clone(&self.file),
            self.decl(position),
        ))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function(name).is_some()
    }

    /// Constants declared with `const` or `define()`, with their values
    /// when they can be computed statically.
    pub fn constants(&self) -> Vec<(String, Option<Value>)> {
        let scope = Scope::for_namespace(&self.file.path, self.node());
        self.node()
            .constants
            .iter()
            .map(|c| {
                let fqn = if c.from_define {
                    c.name.clone()
                } else {
                    qualify(self.name(), &c.name)
                };
                (fqn, try_evaluate(&self.engine, &self.file, &c.value, &scope))
            })
            .collect()
    }

    /// Value of the constant `name` (fully qualified) declared here.
    pub fn constant(&self, name: &str) -> Option<Value> {
        let wanted = constant_key(name);
        self.constants()
            .into_iter()
            .rev()
            .find(|(fqn, _)| constant_key(fqn) == wanted)
            .and_then(|(_, value)| value)
    }

    pub fn has_constant(&self, name: &str) -> bool {
        let wanted = constant_key(name);
        self.constants().iter().any(|(fqn, _)| constant_key(fqn) == wanted)
    }

    /// Class imports of the block as (alias, FQN) pairs.
    pub fn namespace_aliases(&self) -> Vec<(String, String)> {
        NamespaceContext::from_node(self.node()).class_aliases().to_vec()
    }
}

impl fmt::Debug for ReflectionFileNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionFileNamespace")
            .field("file", &self.file.path)
            .field("name", &self.name())
            .finish()
    }
}
