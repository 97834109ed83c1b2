/// Class inheritance resolution.
///
/// This module merges the members a class declares with those it receives
/// from traits, its parent chain, and its interfaces, respecting PHP's
/// precedence rules:
///
///   class own > traits > parent chain > interfaces
///
/// Nothing is copied out of the syntax tree: every merged member is a slot
/// pointing at the node that declares it plus the class PHP reports as its
/// declaring class.  Ancestors are looked up by name through the engine, so
/// a class whose parent lives in another file loads that file lazily.
use std::sync::Arc;

use crate::engine::ReflectionEngine;
use crate::error::{ReflectionError, Result};
use crate::evaluator::Scope;
use crate::index::{DeclRef, symbol_key};
use crate::resolution::NamespaceContext;
use crate::source_cache::ParsedFile;
use crate::types::{
    ClassConstantNode, ClassLikeKind, ClassLikeNode, FunctionLikeNode, NamespaceNode,
    PropertyNode, Visibility, qualify,
};

/// A class-like declaration inside a parsed file.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub file: Arc<ParsedFile>,
    pub decl: DeclRef,
}

impl ClassDecl {
    pub fn new(file: Arc<ParsedFile>, decl: DeclRef) -> Self {
        Self { file, decl }
    }

    pub fn node(&self) -> &ClassLikeNode {
        &self.namespace().classes[self.decl.index]
    }

    pub fn namespace(&self) -> &NamespaceNode {
        &self.file.ast.namespaces[self.decl.namespace]
    }

    pub fn fqn(&self) -> String {
        qualify(&self.namespace().name, &self.node().name)
    }

    pub fn context(&self) -> NamespaceContext {
        NamespaceContext::from_node(self.namespace())
    }

    pub fn kind(&self) -> ClassLikeKind {
        self.node().kind
    }

    /// The parent class FQN, resolved against this declaration's namespace.
    pub fn parent_name(&self) -> Option<String> {
        self.node()
            .parent
            .as_deref()
            .map(|raw| self.context().resolve_class(raw))
    }

    /// Resolve a class name written inside this declaration.
    ///
    /// `self` and `static` become this class, `parent` its parent (or stays
    /// `parent` when there is none).
    pub fn resolve(&self, raw: &str) -> String {
        if raw.eq_ignore_ascii_case("self") || raw.eq_ignore_ascii_case("static") {
            return self.fqn();
        }
        if raw.eq_ignore_ascii_case("parent") {
            return self.parent_name().unwrap_or_else(|| raw.to_string());
        }
        self.context().resolve_class(raw)
    }

    /// Evaluation scope for expressions written inside this declaration.
    pub fn scope(&self, function: Option<&str>) -> Scope {
        let is_trait = self.kind() == ClassLikeKind::Trait;
        Scope {
            file: self.file.path.clone(),
            namespace: self.context(),
            class: Some(self.fqn()),
            parent: self.parent_name(),
            trait_name: is_trait.then(|| self.fqn()),
            function: function.map(str::to_string),
        }
    }

    /// Two handles address the same declaration.
    pub fn same(&self, other: &ClassDecl) -> bool {
        Arc::ptr_eq(&self.file, &other.file) && self.decl == other.decl
    }
}

/// A method visible on a class.
#[derive(Debug, Clone)]
pub struct MethodSlot {
    /// The class-like whose body contains the method node.
    pub owner: ClassDecl,
    pub index: usize,
    /// The class PHP reports as declaring the method.  For trait methods
    /// this is the using class.
    pub declaring: ClassDecl,
    /// Name under which the method is visible (differs for trait aliases).
    pub name: String,
    pub visibility: Visibility,
    pub from_trait: bool,
}

impl MethodSlot {
    fn own(class: &ClassDecl, index: usize) -> Self {
        let node = &class.node().methods[index];
        Self {
            owner: class.clone(),
            index,
            declaring: class.clone(),
            name: node.name.clone(),
            visibility: node.modifiers.visibility,
            from_trait: false,
        }
    }

    pub fn node(&self) -> &FunctionLikeNode {
        &self.owner.node().methods[self.index]
    }

    /// Abstract, or implicitly abstract because an interface declares it.
    pub fn is_abstract(&self) -> bool {
        self.node().modifiers.is_abstract || self.owner.kind() == ClassLikeKind::Interface
    }
}

/// A property visible on a class.
#[derive(Debug, Clone)]
pub struct PropertySlot {
    pub owner: ClassDecl,
    pub index: usize,
    pub declaring: ClassDecl,
}

impl PropertySlot {
    pub fn node(&self) -> &PropertyNode {
        &self.owner.node().properties[self.index]
    }
}

/// A class constant (or enum case) visible on a class.
#[derive(Debug, Clone)]
pub struct ConstantSlot {
    pub owner: ClassDecl,
    pub index: usize,
    pub declaring: ClassDecl,
}

impl ConstantSlot {
    pub fn node(&self) -> &ClassConstantNode {
        &self.owner.node().constants[self.index]
    }
}

/// The merged member tables of one class.
#[derive(Debug, Clone, Default)]
pub struct ResolvedMembers {
    pub methods: Vec<MethodSlot>,
    pub properties: Vec<PropertySlot>,
    pub constants: Vec<ConstantSlot>,
    /// Ancestor class FQNs, nearest first.
    pub parents: Vec<String>,
    /// Every implemented interface FQN, in PHP's reporting order.
    pub interfaces: Vec<String>,
}

impl ResolvedMembers {
    pub fn method(&self, name: &str) -> Option<&MethodSlot> {
        self.methods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn property(&self, name: &str) -> Option<&PropertySlot> {
        self.properties.iter().find(|p| p.node().name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantSlot> {
        self.constants.iter().find(|c| c.node().name == name)
    }

    fn push_interface(&mut self, name: &str) {
        if !self.interfaces.iter().any(|i| i.eq_ignore_ascii_case(name)) {
            self.interfaces.push(name.to_string());
        }
    }

    fn push_method(&mut self, slot: MethodSlot) {
        if self.method(&slot.name).is_none() {
            self.methods.push(slot);
        }
    }

    fn push_property(&mut self, slot: PropertySlot) {
        if self.property(&slot.node().name).is_none() {
            self.properties.push(slot);
        }
    }

    fn push_constant(&mut self, slot: ConstantSlot) {
        if self.constant(&slot.node().name).is_none() {
            self.constants.push(slot);
        }
    }
}

/// Core classes and interfaces that user code extends without their
/// declarations being on disk, with the interfaces each one implies.
const CORE_CLASS_LIKES: &[(&str, &[&str])] = &[
    ("Traversable", &[]),
    ("Iterator", &["Traversable"]),
    ("IteratorAggregate", &["Traversable"]),
    ("SeekableIterator", &["Iterator", "Traversable"]),
    ("OuterIterator", &["Iterator", "Traversable"]),
    ("ArrayAccess", &[]),
    ("Countable", &[]),
    ("Serializable", &[]),
    ("Stringable", &[]),
    ("JsonSerializable", &[]),
    ("UnitEnum", &[]),
    ("BackedEnum", &["UnitEnum"]),
    ("DateTimeInterface", &[]),
    ("Throwable", &["Stringable"]),
    ("Exception", &["Throwable", "Stringable"]),
    ("Error", &["Throwable", "Stringable"]),
    ("ErrorException", &["Throwable", "Stringable"]),
    ("TypeError", &["Throwable", "Stringable"]),
    ("ValueError", &["Throwable", "Stringable"]),
    ("ArithmeticError", &["Throwable", "Stringable"]),
    ("DivisionByZeroError", &["Throwable", "Stringable"]),
    ("JsonException", &["Throwable", "Stringable"]),
    ("LogicException", &["Throwable", "Stringable"]),
    ("BadFunctionCallException", &["Throwable", "Stringable"]),
    ("BadMethodCallException", &["Throwable", "Stringable"]),
    ("DomainException", &["Throwable", "Stringable"]),
    ("InvalidArgumentException", &["Throwable", "Stringable"]),
    ("LengthException", &["Throwable", "Stringable"]),
    ("OutOfRangeException", &["Throwable", "Stringable"]),
    ("RuntimeException", &["Throwable", "Stringable"]),
    ("OutOfBoundsException", &["Throwable", "Stringable"]),
    ("OverflowException", &["Throwable", "Stringable"]),
    ("RangeException", &["Throwable", "Stringable"]),
    ("UnderflowException", &["Throwable", "Stringable"]),
    ("UnexpectedValueException", &["Throwable", "Stringable"]),
    ("ArrayIterator", &["SeekableIterator", "Iterator", "Traversable", "ArrayAccess", "Countable", "Serializable"]),
    ("ArrayObject", &["IteratorAggregate", "Traversable", "ArrayAccess", "Serializable", "Countable"]),
    ("DateTime", &["DateTimeInterface"]),
    ("DateTimeImmutable", &["DateTimeInterface"]),
    ("stdClass", &[]),
];

/// The canonical name and implied interfaces of a core class-like.
pub fn core_class_like(fqn: &str) -> Option<(&'static str, &'static [&'static str])> {
    let fqn = fqn.trim_start_matches('\\');
    CORE_CLASS_LIKES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(fqn))
        .copied()
}

enum Ancestor {
    Declared(ClassDecl),
    /// A core class-like with no declaration on disk: known by name only.
    Core(&'static str, &'static [&'static str]),
}

/// Walks ancestor graphs for one top-level query.
///
/// The stack holds the case-folded FQNs currently being resolved; meeting
/// one of them again means the graph has a cycle.
pub struct InheritanceResolver<'e> {
    engine: &'e ReflectionEngine,
    stack: Vec<(String, String)>,
}

impl<'e> InheritanceResolver<'e> {
    pub fn new(engine: &'e ReflectionEngine) -> Self {
        Self {
            engine,
            stack: Vec::new(),
        }
    }

    /// Merge the full member set of `class`.
    pub fn resolve(&mut self, class: &ClassDecl) -> Result<ResolvedMembers> {
        let fqn = class.fqn();
        let key = symbol_key(&fqn);
        if let Some(pos) = self.stack.iter().position(|(k, _)| *k == key) {
            let mut chain: Vec<String> = self.stack[pos..].iter().map(|(_, n)| n.clone()).collect();
            chain.push(fqn.clone());
            tracing::warn!("circular inheritance: {}", chain.join(" -> "));
            return Err(ReflectionError::CircularInheritance { class: fqn, chain });
        }

        self.stack.push((key, fqn));
        let result = self.merge(class);
        self.stack.pop();
        result
    }

    fn lookup(&self, fqn: &str) -> Result<Ancestor> {
        match self.engine.locate_class(fqn) {
            Ok(decl) => Ok(Ancestor::Declared(decl)),
            Err(err) if err.is_not_found() => match core_class_like(fqn) {
                Some((name, implied)) => Ok(Ancestor::Core(name, implied)),
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    fn merge(&mut self, class: &ClassDecl) -> Result<ResolvedMembers> {
        let node = class.node();
        let mut out = ResolvedMembers::default();

        for index in 0..node.methods.len() {
            out.methods.push(MethodSlot::own(class, index));
        }
        for index in 0..node.properties.len() {
            out.properties.push(PropertySlot {
                owner: class.clone(),
                index,
                declaring: class.clone(),
            });
        }
        for index in 0..node.constants.len() {
            out.constants.push(ConstantSlot {
                owner: class.clone(),
                index,
                declaring: class.clone(),
            });
        }

        if !node.traits.is_empty() {
            self.merge_traits(class, &mut out)?;
        }

        if let Some(parent) = class.parent_name() {
            match self.lookup(&parent)? {
                Ancestor::Declared(decl) => {
                    let inherited = self.resolve(&decl)?;
                    out.parents.push(decl.fqn());
                    out.parents.extend(inherited.parents.iter().cloned());
                    for name in &inherited.interfaces {
                        out.push_interface(name);
                    }
                    // Private parent methods stay visible, like getMethods().
                    for slot in inherited.methods {
                        out.push_method(slot);
                    }
                    for slot in inherited.properties {
                        if slot.node().modifiers.visibility != Visibility::Private {
                            out.push_property(slot);
                        }
                    }
                    for slot in inherited.constants {
                        if slot.node().visibility != Visibility::Private {
                            out.push_constant(slot);
                        }
                    }
                }
                Ancestor::Core(name, implied) => {
                    out.parents.push(name.to_string());
                    for iface in implied {
                        out.push_interface(iface);
                    }
                }
            }
        }

        for raw in &node.interfaces {
            let fqn = class.resolve(raw);
            match self.lookup(&fqn)? {
                Ancestor::Declared(decl) => {
                    let inherited = self.resolve(&decl)?;
                    out.push_interface(&decl.fqn());
                    for name in &inherited.interfaces {
                        out.push_interface(name);
                    }
                    for slot in inherited.methods {
                        out.push_method(slot);
                    }
                    for slot in inherited.constants {
                        out.push_constant(slot);
                    }
                }
                Ancestor::Core(name, implied) => {
                    out.push_interface(name);
                    for iface in implied {
                        out.push_interface(iface);
                    }
                }
            }
        }

        if node.kind == ClassLikeKind::Enum {
            out.push_interface("UnitEnum");
            if node.enum_backing.is_some() {
                out.push_interface("BackedEnum");
            }
        }

        Ok(out)
    }

    /// Import the members of every used trait, applying `insteadof` and
    /// `as` adaptations.  Members the class declares itself win.
    fn merge_traits(&mut self, class: &ClassDecl, out: &mut ResolvedMembers) -> Result<()> {
        let node = class.node();

        let mut excluded: Vec<(String, String)> = Vec::new();
        for rule in &node.trait_precedences {
            for loser in &rule.insteadof {
                excluded.push((symbol_key(&class.resolve(loser)), rule.method_name.to_ascii_lowercase()));
            }
        }

        for raw in &node.traits {
            let trait_fqn = class.resolve(raw);
            let trait_decl = self.engine.locate_class(&trait_fqn)?;
            let members = self.resolve(&trait_decl)?;
            let trait_key = symbol_key(&trait_fqn);

            for slot in &members.methods {
                let method_key = slot.name.to_ascii_lowercase();

                for alias in &node.trait_aliases {
                    let Some(new_name) = &alias.alias else {
                        continue;
                    };
                    if !alias.method_name.eq_ignore_ascii_case(&slot.name) {
                        continue;
                    }
                    if let Some(t) = &alias.trait_name
                        && symbol_key(&class.resolve(t)) != trait_key
                    {
                        continue;
                    }
                    out.push_method(MethodSlot {
                        owner: slot.owner.clone(),
                        index: slot.index,
                        declaring: class.clone(),
                        name: new_name.clone(),
                        visibility: alias.visibility.unwrap_or(slot.visibility),
                        from_trait: true,
                    });
                }

                if excluded.iter().any(|(t, m)| *t == trait_key && *m == method_key) {
                    continue;
                }

                // `method as protected;` changes visibility without renaming.
                let visibility = node
                    .trait_aliases
                    .iter()
                    .filter(|a| a.alias.is_none() && a.method_name.eq_ignore_ascii_case(&slot.name))
                    .filter(|a| {
                        a.trait_name
                            .as_deref()
                            .is_none_or(|t| symbol_key(&class.resolve(t)) == trait_key)
                    })
                    .find_map(|a| a.visibility)
                    .unwrap_or(slot.visibility);

                out.push_method(MethodSlot {
                    owner: slot.owner.clone(),
                    index: slot.index,
                    declaring: class.clone(),
                    name: slot.name.clone(),
                    visibility,
                    from_trait: true,
                });
            }

            for slot in members.properties {
                out.push_property(PropertySlot {
                    declaring: class.clone(),
                    ..slot
                });
            }
            for slot in members.constants {
                out.push_constant(ConstantSlot {
                    declaring: class.clone(),
                    ..slot
                });
            }
        }

        Ok(())
    }

    /// The prototype of `method`: the first ancestor of its declaring class
    /// (parents nearest-first, then interfaces in order) that declares a
    /// method of the same name which is abstract or interface-declared.
    /// Private methods have none.
    pub fn prototype(&mut self, method: &MethodSlot) -> Result<Option<MethodSlot>> {
        if method.visibility == Visibility::Private {
            return Ok(None);
        }

        let declaring = self.resolve(&method.declaring)?;
        let ancestors = declaring.parents.iter().chain(declaring.interfaces.iter());

        for name in ancestors {
            let Ancestor::Declared(decl) = self.lookup(name)? else {
                continue;
            };
            let members = self.resolve(&decl)?;
            let found = members
                .methods
                .iter()
                .find(|m| m.declaring.same(&decl) && m.name.eq_ignore_ascii_case(&method.name));
            if let Some(candidate) = found
                && candidate.is_abstract()
            {
                return Ok(Some(candidate.clone()));
            }
        }

        Ok(None)
    }
}
