use std::cell::Cell;
use std::fmt;
use std::path::Path;

use crate::engine::ReflectionEngine;
use crate::error::Result;
use crate::evaluator::{Scope, try_evaluate};
use crate::inheritance::{ClassDecl, PropertySlot};
use crate::runtime::{LiveHandle, ValueAccessible, check_access};
use crate::types::{PropertyNode, Visibility};
use crate::value::Value;

use super::render;
use super::{IS_READONLY, IS_STATIC, ReflectionClass, ReflectionType, Snapshot, visibility_bits};

/// A declared or constructor-promoted property.
pub struct ReflectionProperty {
    engine: ReflectionEngine,
    slot: PropertySlot,
    accessible: Cell<bool>,
}

impl ReflectionProperty {
    /// Reflect `class::$name` (name without the `$`).
    pub fn new(engine: &ReflectionEngine, class: &str, name: &str) -> Result<Self> {
        ReflectionClass::new(engine, class)?.property(name)
    }

    pub(crate) fn from_slot(engine: &ReflectionEngine, slot: PropertySlot) -> Self {
        Self {
            engine: engine.clone(),
            slot,
            accessible: Cell::new(false),
        }
    }

    fn node(&self) -> &PropertyNode {
        self.slot.node()
    }

    fn declaring(&self) -> &ClassDecl {
        &self.slot.declaring
    }

    /// Initializers written in a trait see the using class as `self`.
    fn scope(&self) -> Scope {
        let mut scope = self.slot.owner.scope(None);
        if !self.slot.owner.same(self.declaring()) {
            scope.class = Some(self.declaring().fqn());
            scope.parent = self.declaring().parent_name();
        }
        scope
    }

    pub fn name(&self) -> &str {
        &self.node().name
    }

    /// Name of the declaring class.
    pub fn class(&self) -> String {
        self.declaring().fqn()
    }

    pub fn declaring_class(&self) -> ReflectionClass {
        ReflectionClass::from_decl(&self.engine, self.declaring().clone())
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
        &self.slot.owner.file.path
    }

    /// Declared at compile time (every property this engine sees is).
    pub fn is_default(&self) -> bool {
        true
    }

    pub fn visibility(&self) -> Visibility {
        self.node().modifiers.visibility
    }

    pub fn is_public(&self) -> bool {
        self.visibility() == Visibility::Public
    }

    pub fn is_protected(&self) -> bool {
        self.visibility() == Visibility::Protected
    }

    pub fn is_private(&self) -> bool {
        self.visibility() == Visibility::Private
    }

    pub fn is_static(&self) -> bool {
        self.node().modifiers.is_static
    }

    /// `readonly` on the property or on its class.
    pub fn is_readonly(&self) -> bool {
        self.node().modifiers.is_readonly || self.slot.owner.node().is_readonly
    }

    pub fn is_promoted(&self) -> bool {
        self.node().is_promoted
    }

    pub fn modifiers(&self) -> u32 {
        let mut bits = visibility_bits(self.visibility());
        if self.is_static() {
            bits |= IS_STATIC;
        }
        if self.is_readonly() {
            bits |= IS_READONLY;
        }
        bits
    }

    pub fn has_type(&self) -> bool {
        self.node().type_hint.is_some()
    }

    pub fn ty(&self) -> Option<ReflectionType> {
        self.node()
            .type_hint
            .as_ref()
            .map(|hint| ReflectionType::from_hint(hint, &self.slot.owner.context(), false))
    }

    /// Untyped properties default to `null`; typed and promoted ones have
    /// no default unless one is written.
    pub fn has_default_value(&self) -> bool {
        if self.is_promoted() {
            return false;
        }
        self.node().default.is_some() || !self.has_type()
    }

    /// The evaluated default, `None` when there is none or it cannot be
    /// computed statically.
    pub fn default_value(&self) -> Option<Value> {
        if !self.has_default_value() {
            return None;
        }
        match &self.node().default {
            Some(expr) => try_evaluate(&self.engine, &self.slot.owner.file, expr, &self.scope()),
            None => Some(Value::Null),
        }
    }

    pub(crate) fn default_repr(&self) -> Option<String> {
        if !self.has_default_value() {
            return None;
        }
        match &self.node().default {
            Some(expr) => Some(render::default_value(
                &self.engine,
                &self.slot.owner.file,
                expr,
                self.node().default_source.as_deref(),
                &self.scope(),
            )),
            None => Some("NULL".to_string()),
        }
    }

    /// Current value, read from the live runtime.  `this` is ignored for
    /// static properties.
    pub fn value(&self, this: Option<&Value>) -> Result<Value> {
        let bridge = self.engine.require_bridge("ReflectionProperty::getValue")?;
        check_access(self.visibility(), self.accessible.get(), &self.class(), self.name())?;
        let handle = self.live_handle()?;
        bridge.get_property(&handle, self.name(), self.receiver(this))
    }

    pub fn set_value(&self, this: Option<&Value>, value: Value) -> Result<()> {
        let bridge = self.engine.require_bridge("ReflectionProperty::setValue")?;
        check_access(self.visibility(), self.accessible.get(), &self.class(), self.name())?;
        let handle = self.live_handle()?;
        bridge.set_property(&handle, self.name(), self.receiver(this), value)
    }

    pub fn is_initialized(&self, this: Option<&Value>) -> Result<bool> {
        let bridge = self.engine.require_bridge("ReflectionProperty::isInitialized")?;
        check_access(self.visibility(), self.accessible.get(), &self.class(), self.name())?;
        let handle = self.live_handle()?;
        bridge.is_initialized(&handle, self.name(), self.receiver(this))
    }

    fn receiver<'a>(&self, this: Option<&'a Value>) -> Option<&'a Value> {
        if self.is_static() { None } else { this }
    }

    pub(crate) fn render(&self, out: &mut String, indent: &str) {
        render::property_string(out, self, indent);
    }
}

impl ValueAccessible for ReflectionProperty {
    fn set_accessible(&self, accessible: bool) {
        self.accessible.set(accessible);
    }

    fn is_accessible(&self) -> bool {
        self.accessible.get()
    }

    fn live_handle(&self) -> Result<LiveHandle> {
        let bridge = self.engine.require_bridge("ReflectionProperty")?;
        bridge.handle(&self.class(), &self.declaring().file.path)
    }
}

impl fmt::Display for ReflectionProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, "");
        f.write_str(&out)
    }
}

impl fmt::Debug for ReflectionProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionProperty")
            .field("class", &self.class())
            .field("name", &self.name())
            .finish()
    }
}

impl Snapshot for ReflectionProperty {
    fn snapshot(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name().to_string()), ("class", self.class())]
    }
}
