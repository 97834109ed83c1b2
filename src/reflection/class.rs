use std::cell::OnceCell;
use std::fmt;
use std::path::Path;

use crate::engine::ReflectionEngine;
use crate::error::{ReflectionError, Result};
use crate::inheritance::{ClassDecl, InheritanceResolver, ResolvedMembers, core_class_like};
use crate::runtime::{LiveHandle, ValueAccessible, check_access};
use crate::types::{ClassLikeKind, ClassLikeNode};
use crate::value::Value;

use super::render;
use super::{
    IS_EXPLICIT_ABSTRACT, IS_FINAL, IS_READONLY_CLASS, ReflectionClassConstant, ReflectionMethod,
    ReflectionProperty, Snapshot,
};

/// A class, interface, trait, or enum.
///
/// The merged member tables are resolved on first use and kept for the
/// lifetime of the instance.
pub struct ReflectionClass {
    engine: ReflectionEngine,
    decl: ClassDecl,
    members: OnceCell<ResolvedMembers>,
}

impl ReflectionClass {
    /// Reflect the class-like `name` (fully qualified, case-insensitive, a
    /// leading `\` is accepted).  Fails with `ClassNotFound`.
    pub fn new(engine: &ReflectionEngine, name: &str) -> Result<Self> {
        let decl = engine.locate_class(name)?;
        Ok(Self::from_decl(engine, decl))
    }

    pub(crate) fn from_decl(engine: &ReflectionEngine, decl: ClassDecl) -> Self {
        Self {
            engine: engine.clone(),
            decl,
            members: OnceCell::new(),
        }
    }

    fn node(&self) -> &ClassLikeNode {
        self.decl.node()
    }

    fn members(&self) -> Result<&ResolvedMembers> {
        if let Some(members) = self.members.get() {
            return Ok(members);
        }
        let resolved = InheritanceResolver::new(&self.engine).resolve(&self.decl)?;
        Ok(self.members.get_or_init(|| resolved))
    }

    pub fn name(&self) -> String {
        self.decl.fqn()
    }

    pub fn short_name(&self) -> &str {
        &self.node().name
    }

    pub fn namespace_name(&self) -> &str {
        &self.decl.namespace().name
    }

    pub fn in_namespace(&self) -> bool {
        !self.namespace_name().is_empty()
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

    pub fn file_name(&self) -> &Path {
        &self.decl.file.path
    }

    pub fn is_internal(&self) -> bool {
        false
    }

    pub fn is_user_defined(&self) -> bool {
        true
    }

    pub fn extension_name(&self) -> Option<&str> {
        None
    }

    pub fn kind(&self) -> ClassLikeKind {
        self.node().kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == ClassLikeKind::Interface
    }

    pub fn is_trait(&self) -> bool {
        self.kind() == ClassLikeKind::Trait
    }

    pub fn is_enum(&self) -> bool {
        self.kind() == ClassLikeKind::Enum
    }

    /// Declared `abstract`, or left with abstract methods (interfaces and
    /// traits with abstract methods count).
    pub fn is_abstract(&self) -> Result<bool> {
        if self.node().is_abstract {
            return Ok(true);
        }
        Ok(self.members()?.methods.iter().any(|m| m.is_abstract()))
    }

    /// Enums are implicitly final.
    pub fn is_final(&self) -> bool {
        self.node().is_final || self.is_enum()
    }

    pub fn is_readonly(&self) -> bool {
        self.node().is_readonly
    }

    pub fn is_anonymous(&self) -> bool {
        false
    }

    pub fn modifiers(&self) -> u32 {
        let mut bits = 0;
        if self.node().is_abstract {
            bits |= IS_EXPLICIT_ABSTRACT;
        }
        if self.is_final() {
            bits |= IS_FINAL;
        }
        if self.is_readonly() {
            bits |= IS_READONLY_CLASS;
        }
        bits
    }

    /// A concrete class whose constructor (if any) is public.
    pub fn is_instantiable(&self) -> Result<bool> {
        if self.kind() != ClassLikeKind::Class || self.is_abstract()? {
            return Ok(false);
        }
        Ok(self.constructor()?.is_none_or(|ctor| ctor.is_public()))
    }

    pub fn is_cloneable(&self) -> Result<bool> {
        if self.kind() != ClassLikeKind::Class || self.is_abstract()? {
            return Ok(false);
        }
        Ok(self.find_method("__clone")?.is_none_or(|clone| clone.is_public()))
    }

    /// A concrete class implementing `Traversable`.
    pub fn is_iterable(&self) -> Result<bool> {
        if matches!(self.kind(), ClassLikeKind::Interface | ClassLikeKind::Trait) || self.is_abstract()? {
            return Ok(false);
        }
        self.implements_interface("Traversable")
    }

    /// Name of the parent class, core parents included.
    pub fn parent_class_name(&self) -> Result<Option<String>> {
        Ok(self.members()?.parents.first().cloned())
    }

    /// The parent class.  Core parents that are known by name only fail
    /// with `ClassNotFound`.
    pub fn parent_class(&self) -> Result<Option<ReflectionClass>> {
        match self.parent_class_name()? {
            Some(parent) => ReflectionClass::new(&self.engine, &parent).map(Some),
            None => Ok(None),
        }
    }

    /// Every implemented interface, parent's first.
    pub fn interface_names(&self) -> Result<Vec<String>> {
        Ok(self.members()?.interfaces.clone())
    }

    /// Reflections of the implemented interfaces that have a declaration.
    pub fn interfaces(&self) -> Result<Vec<ReflectionClass>> {
        let mut out = Vec::new();
        for name in &self.members()?.interfaces {
            match ReflectionClass::new(&self.engine, name) {
                Ok(class) => out.push(class),
                Err(err) if err.is_not_found() && core_class_like(name).is_some() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Traits used directly by this class, resolved.
    pub fn trait_names(&self) -> Vec<String> {
        self.node().traits.iter().map(|raw| self.decl.resolve(raw)).collect()
    }

    pub fn traits(&self) -> Result<Vec<ReflectionClass>> {
        self.trait_names()
            .iter()
            .map(|name| ReflectionClass::new(&self.engine, name))
            .collect()
    }

    /// `alias => Trait::method` for every renaming `as` rule.
    pub fn trait_aliases(&self) -> Result<Vec<(String, String)>> {
        let traits = self.traits()?;
        let mut out = Vec::new();
        for rule in &self.node().trait_aliases {
            let Some(alias) = &rule.alias else {
                continue;
            };
            let source = match &rule.trait_name {
                Some(raw) => Some(self.decl.resolve(raw)),
                None => traits
                    .iter()
                    .find(|t| {
                        t.node()
                            .methods
                            .iter()
                            .any(|m| m.name.eq_ignore_ascii_case(&rule.method_name))
                    })
                    .map(ReflectionClass::name),
            };
            if let Some(source) = source {
                out.push((alias.clone(), format!("{}::{}", source, rule.method_name)));
            }
        }
        Ok(out)
    }

    /// Every visible method; with a filter, only those whose modifiers
    /// share a bit with it.
    pub fn methods(&self, filter: Option<u32>) -> Result<Vec<ReflectionMethod>> {
        let methods = self
            .members()?
            .methods
            .iter()
            .map(|slot| ReflectionMethod::from_slot(&self.engine, self.decl.clone(), slot.clone()))
            .filter(|m| filter.is_none_or(|f| m.modifiers() & f != 0))
            .collect();
        Ok(methods)
    }

    pub(crate) fn find_method(&self, name: &str) -> Result<Option<ReflectionMethod>> {
        Ok(self
            .members()?
            .method(name)
            .map(|slot| ReflectionMethod::from_slot(&self.engine, self.decl.clone(), slot.clone())))
    }

    pub fn method(&self, name: &str) -> Result<ReflectionMethod> {
        self.find_method(name)?
            .ok_or_else(|| ReflectionError::MethodNotFound {
                class: self.name(),
                method: name.to_string(),
            })
    }

    pub fn has_method(&self, name: &str) -> Result<bool> {
        Ok(self.members()?.method(name).is_some())
    }

    pub fn properties(&self, filter: Option<u32>) -> Result<Vec<ReflectionProperty>> {
        let properties = self
            .members()?
            .properties
            .iter()
            .map(|slot| ReflectionProperty::from_slot(&self.engine, slot.clone()))
            .filter(|p| filter.is_none_or(|f| p.modifiers() & f != 0))
            .collect();
        Ok(properties)
    }

    /// Property `name`, without the `$`.
    pub fn property(&self, name: &str) -> Result<ReflectionProperty> {
        let name = name.trim_start_matches('$');
        self.members()?
            .property(name)
            .map(|slot| ReflectionProperty::from_slot(&self.engine, slot.clone()))
            .ok_or_else(|| ReflectionError::PropertyNotFound {
                class: self.name(),
                property: name.to_string(),
            })
    }

    pub fn has_property(&self, name: &str) -> Result<bool> {
        Ok(self.members()?.property(name.trim_start_matches('$')).is_some())
    }

    pub fn reflection_constants(&self) -> Result<Vec<ReflectionClassConstant>> {
        Ok(self
            .members()?
            .constants
            .iter()
            .map(|slot| ReflectionClassConstant::from_slot(&self.engine, slot.clone()))
            .collect())
    }

    pub fn reflection_constant(&self, name: &str) -> Result<ReflectionClassConstant> {
        self.members()?
            .constant(name)
            .map(|slot| ReflectionClassConstant::from_slot(&self.engine, slot.clone()))
            .ok_or_else(|| ReflectionError::ClassConstantNotFound {
                class: self.name(),
                constant: name.to_string(),
            })
    }

    /// Every constant with its evaluated value.
    pub fn constants(&self) -> Result<Vec<(String, Value)>> {
        self.reflection_constants()?
            .iter()
            .map(|c| Ok((c.name().to_string(), c.value()?)))
            .collect()
    }

    pub fn constant(&self, name: &str) -> Result<Value> {
        self.reflection_constant(name)?.value()
    }

    pub fn has_constant(&self, name: &str) -> Result<bool> {
        Ok(self.members()?.constant(name).is_some())
    }

    pub fn constructor(&self) -> Result<Option<ReflectionMethod>> {
        self.find_method("__construct")
    }

    /// Whether `name` is a proper ancestor class or an implemented
    /// interface.
    pub fn is_subclass_of(&self, name: &str) -> Result<bool> {
        let name = name.trim_start_matches('\\');
        let members = self.members()?;
        Ok(members
            .parents
            .iter()
            .chain(members.interfaces.iter())
            .any(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn implements_interface(&self, name: &str) -> Result<bool> {
        let name = name.trim_start_matches('\\');
        if self.is_interface() && self.name().eq_ignore_ascii_case(name) {
            return Ok(true);
        }
        Ok(self
            .members()?
            .interfaces
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Properties that have a default, with the value when it can be
    /// computed statically.
    pub fn default_properties(&self) -> Result<Vec<(String, Option<Value>)>> {
        Ok(self
            .properties(None)?
            .iter()
            .filter(|p| p.has_default_value())
            .map(|p| (p.name().to_string(), p.default_value()))
            .collect())
    }

    /// The class block PHP's `ReflectionClass::__toString` prints.
    pub fn to_string(&self) -> Result<String> {
        render::class_string(self)
    }

    fn live_handle(&self) -> Result<LiveHandle> {
        let bridge = self.engine.require_bridge("ReflectionClass")?;
        bridge.handle(&self.name(), self.file_name())
    }

    /// Current values of every static property, read from the live runtime.
    pub fn static_properties(&self) -> Result<Vec<(String, Value)>> {
        let mut out = Vec::new();
        for property in self.properties(None)? {
            if !property.is_static() {
                continue;
            }
            property.set_accessible(true);
            out.push((property.name().to_string(), property.value(None)?));
        }
        Ok(out)
    }

    pub fn static_property_value(&self, name: &str) -> Result<Value> {
        let property = self.static_property(name)?;
        property.value(None)
    }

    pub fn set_static_property_value(&self, name: &str, value: Value) -> Result<()> {
        let property = self.static_property(name)?;
        property.set_value(None, value)
    }

    fn static_property(&self, name: &str) -> Result<ReflectionProperty> {
        let property = self.property(name)?;
        if !property.is_static() {
            return Err(ReflectionError::PropertyNotFound {
                class: self.name(),
                property: format!("{} (not static)", property.name()),
            });
        }
        property.set_accessible(true);
        Ok(property)
    }

    pub fn new_instance(&self, args: &[Value]) -> Result<Value> {
        self.new_instance_args(args)
    }

    pub fn new_instance_args(&self, args: &[Value]) -> Result<Value> {
        let bridge = self.engine.require_bridge("ReflectionClass::newInstance")?;
        self.ensure_instantiable()?;
        if let Some(ctor) = self.constructor()? {
            check_access(ctor.visibility(), false, &self.name(), ctor.name())?;
        }
        let handle = self.live_handle()?;
        bridge.instantiate(&handle, Some(args))
    }

    pub fn new_instance_without_constructor(&self) -> Result<Value> {
        let bridge = self.engine.require_bridge("ReflectionClass::newInstanceWithoutConstructor")?;
        self.ensure_instantiable()?;
        let handle = self.live_handle()?;
        bridge.instantiate(&handle, None)
    }

    fn ensure_instantiable(&self) -> Result<()> {
        if self.kind() != ClassLikeKind::Class || self.is_abstract()? {
            return Err(ReflectionError::Runtime(
                format!("cannot instantiate {} {}", self.kind().as_str(), self.name()).into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ReflectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionClass")
            .field("name", &self.name())
            .field("file", &self.file_name())
            .finish()
    }
}

impl Snapshot for ReflectionClass {
    fn snapshot(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::ClassMapLocator;
    use crate::reflection::{IS_PRIVATE, IS_PUBLIC, IS_STATIC};

    fn engine_with(files: &[(&str, &str)]) -> (tempfile::TempDir, ReflectionEngine) {
        let dir = tempfile::tempdir().unwrap();
        let mut locator = ClassMapLocator::new();
        for (name, php) in files {
            let path = dir.path().join(format!("{}.php", name.replace('\\', "_")));
            std::fs::write(&path, php).unwrap();
            locator.insert(name, path);
        }
        (dir, ReflectionEngine::builder().locator(locator).build())
    }

    #[test]
    fn names_and_flags() {
        let (_dir, engine) = engine_with(&[(
            "App\\Model\\User",
            "<?php\nnamespace App\\Model;\n\n/** A user. */\nfinal class User\n{\n}\n",
        )]);
        let class = engine.class("\\app\\model\\user").unwrap();
        assert_eq!(class.name(), "App\\Model\\User");
        assert_eq!(class.short_name(), "User");
        assert_eq!(class.namespace_name(), "App\\Model");
        assert!(class.in_namespace());
        assert_eq!(class.doc_comment(), Some("/** A user. */"));
        assert_eq!((class.start_line(), class.end_line()), (5, 7));
        assert!(class.is_final());
        assert_eq!(class.modifiers(), IS_FINAL);
        assert!(class.is_instantiable().unwrap());
        assert!(!class.is_abstract().unwrap());
    }

    #[test]
    fn abstract_and_constructor_visibility() {
        let (_dir, engine) = engine_with(&[
            ("Shape", "<?php\nabstract class Shape { abstract public function area(): float; }\n"),
            ("Single", "<?php\nclass Single { private function __construct() {} }\n"),
            ("Named", "<?php\ninterface Named { public function name(): string; }\n"),
        ]);
        let shape = engine.class("Shape").unwrap();
        assert!(shape.is_abstract().unwrap());
        assert_eq!(shape.modifiers(), IS_EXPLICIT_ABSTRACT);
        assert!(!shape.is_instantiable().unwrap());

        let single = engine.class("Single").unwrap();
        assert!(!single.is_instantiable().unwrap());
        assert!(single.is_cloneable().unwrap());

        let named = engine.class("Named").unwrap();
        assert!(named.is_interface());
        assert!(named.is_abstract().unwrap());
        assert_eq!(named.modifiers(), 0);
    }

    #[test]
    fn member_filters() {
        let (_dir, engine) = engine_with(&[(
            "Counter",
            concat!(
                "<?php\nclass Counter {\n",
                "    public static $instances = 0;\n",
                "    private int $count = 0;\n",
                "    public function increment(): void {}\n",
                "    private static function reset(): void {}\n",
                "}\n",
            ),
        )]);
        let class = engine.class("Counter").unwrap();
        let names = |filter| -> Vec<String> {
            class
                .methods(filter)
                .unwrap()
                .iter()
                .map(|m| m.name().to_string())
                .collect()
        };
        assert_eq!(names(None), vec!["increment", "reset"]);
        assert_eq!(names(Some(IS_STATIC)), vec!["reset"]);
        assert_eq!(names(Some(IS_PUBLIC)), vec!["increment"]);

        let private: Vec<_> = class.properties(Some(IS_PRIVATE)).unwrap();
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].name(), "count");
        assert!(class.has_property("$instances").unwrap());
        assert!(matches!(
            class.method("missing"),
            Err(ReflectionError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn constants_and_enum_cases() {
        let (_dir, engine) = engine_with(&[(
            "Suit",
            concat!(
                "<?php\nenum Suit: string {\n",
                "    case Hearts = 'H';\n",
                "    const Wild = self::Hearts;\n",
                "    const COUNT = 4;\n",
                "}\n",
            ),
        )]);
        let suit = engine.class("Suit").unwrap();
        assert!(suit.is_enum());
        assert!(suit.is_final());
        assert_eq!(suit.interface_names().unwrap(), vec!["UnitEnum", "BackedEnum"]);

        let hearts = Value::EnumCase {
            class: "Suit".into(),
            case: "Hearts".into(),
        };
        assert_eq!(suit.constant("Hearts").unwrap(), hearts);
        assert_eq!(suit.constant("Wild").unwrap(), hearts);
        assert_eq!(suit.constant("COUNT").unwrap(), Value::Int(4));
        assert!(suit.reflection_constant("Hearts").unwrap().is_enum_case());
        assert!(matches!(
            suit.constant("Spades"),
            Err(ReflectionError::ClassConstantNotFound { .. })
        ));
    }

    #[test]
    fn core_ancestors_are_known_by_name() {
        let (_dir, engine) = engine_with(&[(
            "Bag",
            "<?php\nclass Bag extends ArrayObject implements Countable {}\n",
        )]);
        let bag = engine.class("Bag").unwrap();
        assert!(bag.is_subclass_of("arrayobject").unwrap());
        assert!(bag.implements_interface("Traversable").unwrap());
        assert!(bag.is_iterable().unwrap());
        assert!(bag.interfaces().unwrap().is_empty());
        assert!(matches!(bag.parent_class(), Err(ReflectionError::ClassNotFound(_))));
    }

    #[test]
    fn trait_aliases_name_their_source() {
        let (_dir, engine) = engine_with(&[
            ("Hello", "<?php\ntrait Hello { public function hi() {} }\n"),
            ("Greeter", "<?php\nclass Greeter { use Hello { hi as protected wave; } }\n"),
        ]);
        let greeter = engine.class("Greeter").unwrap();
        assert_eq!(greeter.trait_names(), vec!["Hello"]);
        assert_eq!(
            greeter.trait_aliases().unwrap(),
            vec![("wave".to_string(), "Hello::hi".to_string())]
        );
        assert!(greeter.method("wave").unwrap().is_protected());
    }
}
