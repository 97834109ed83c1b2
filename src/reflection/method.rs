use std::cell::Cell;
use std::fmt;
use std::path::Path;

use crate::engine::ReflectionEngine;
use crate::error::{ReflectionError, Result};
use crate::inheritance::{ClassDecl, InheritanceResolver, MethodSlot};
use crate::runtime::{CallableHandle, LiveHandle, Member, ValueAccessible, check_access};
use crate::types::{FunctionLikeNode, Visibility};
use crate::value::Value;

use super::function::Callable;
use super::render;
use super::{
    IS_ABSTRACT, IS_FINAL, IS_STATIC, ReflectionClass, ReflectionParameter, ReflectionType,
    Snapshot, visibility_bits,
};

/// A method as seen from a class (declared, imported from a trait, or
/// inherited).
pub struct ReflectionMethod {
    engine: ReflectionEngine,
    /// The class the method was requested from.
    reflected: ClassDecl,
    slot: MethodSlot,
    accessible: Cell<bool>,
}

impl ReflectionMethod {
    /// Reflect `class::name`.  Fails with `ClassNotFound` or
    /// `MethodNotFound`.
    pub fn new(engine: &ReflectionEngine, class: &str, name: &str) -> Result<Self> {
        ReflectionClass::new(engine, class)?.method(name)
    }

    pub(crate) fn from_slot(engine: &ReflectionEngine, reflected: ClassDecl, slot: MethodSlot) -> Self {
        Self {
            engine: engine.clone(),
            reflected,
            slot,
            accessible: Cell::new(false),
        }
    }

    fn slot(&self) -> &MethodSlot {
        &self.slot
    }

    /// The method as a callable, for code shared with functions.
    fn callable(&self) -> Callable {
        Callable::Method(self.slot.clone())
    }

    fn node(&self) -> &FunctionLikeNode {
        self.slot.node()
    }

    pub fn name(&self) -> &str {
        &self.slot().name
    }

    /// Name of the declaring class.
    pub fn class(&self) -> String {
        self.slot().declaring.fqn()
    }

    pub fn declaring_class(&self) -> ReflectionClass {
        ReflectionClass::from_decl(&self.engine, self.slot().declaring.clone())
    }

    /// The abstract or interface method this one implements, if any.
    pub fn prototype(&self) -> Result<Option<ReflectionMethod>> {
        let proto = InheritanceResolver::new(&self.engine).prototype(self.slot())?;
        Ok(proto.map(|slot| {
            let reflected = slot.declaring.clone();
            ReflectionMethod::from_slot(&self.engine, reflected, slot)
        }))
    }

    pub fn short_name(&self) -> &str {
        self.name()
    }

    /// Methods never live in a namespace of their own.
    pub fn namespace_name(&self) -> &str {
        ""
    }

    pub fn in_namespace(&self) -> bool {
        false
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

    pub fn is_internal(&self) -> bool {
        false
    }

    pub fn is_user_defined(&self) -> bool {
        true
    }

    pub fn extension_name(&self) -> Option<&str> {
        None
    }

    pub fn visibility(&self) -> Visibility {
        self.slot().visibility
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

    pub fn is_abstract(&self) -> bool {
        self.slot().is_abstract()
    }

    pub fn is_final(&self) -> bool {
        self.node().modifiers.is_final
    }

    pub fn is_static(&self) -> bool {
        self.node().modifiers.is_static
    }

    pub fn is_constructor(&self) -> bool {
        self.name().eq_ignore_ascii_case("__construct")
    }

    pub fn is_destructor(&self) -> bool {
        self.name().eq_ignore_ascii_case("__destruct")
    }

    pub fn modifiers(&self) -> u32 {
        let mut bits = visibility_bits(self.visibility());
        if self.is_static() {
            bits |= IS_STATIC;
        }
        if self.is_final() {
            bits |= IS_FINAL;
        }
        if self.is_abstract() {
            bits |= IS_ABSTRACT;
        }
        bits
    }

    pub fn number_of_parameters(&self) -> usize {
        self.node().parameters.len()
    }

    pub fn number_of_required_parameters(&self) -> usize {
        self.callable().required_parameters()
    }

    pub fn parameters(&self) -> Vec<ReflectionParameter> {
        self.callable().parameters(&self.engine)
    }

    pub fn returns_reference(&self) -> bool {
        self.node().returns_reference
    }

    pub fn has_return_type(&self) -> bool {
        self.node().return_type.is_some()
    }

    pub fn return_type(&self) -> Option<ReflectionType> {
        self.callable().return_type()
    }

    pub fn is_variadic(&self) -> bool {
        self.callable().is_variadic()
    }

    pub fn is_generator(&self) -> bool {
        self.node().is_generator
    }

    pub fn is_closure(&self) -> bool {
        false
    }

    pub fn is_deprecated(&self) -> bool {
        false
    }

    pub fn static_variables(&self) -> Vec<(String, Option<Value>)> {
        self.callable().static_variables(&self.engine)
    }

    pub fn closure_this(&self) -> Option<Value> {
        None
    }

    pub fn closure_scope_class(&self) -> Option<ReflectionClass> {
        None
    }

    /// Whether the method came from a trait `use`.
    pub fn is_from_trait(&self) -> bool {
        self.slot().from_trait
    }

    pub fn invoke(&self, this: Option<&Value>, args: &[Value]) -> Result<Value> {
        self.invoke_args(this, args)
    }

    pub fn invoke_args(&self, this: Option<&Value>, args: &[Value]) -> Result<Value> {
        let bridge = self.engine.require_bridge("ReflectionMethod::invoke")?;
        self.check_callable()?;
        let handle = self.live_handle()?;
        bridge.invoke(&handle, Member::Method(self.name()), this, args)
    }

    /// A callable bound to `this` (ignored for static methods).
    pub fn closure(&self, this: Option<Value>) -> Result<CallableHandle> {
        let bridge = self.engine.require_bridge("ReflectionMethod::getClosure")?;
        self.check_callable()?;
        let handle = self.live_handle()?;
        let this = if self.is_static() { None } else { this };
        Ok(CallableHandle::new(
            bridge.clone(),
            handle,
            Some(self.name().to_string()),
            this,
        ))
    }

    fn check_callable(&self) -> Result<()> {
        if self.is_abstract() {
            return Err(ReflectionError::Runtime(
                format!("trying to invoke abstract method {}::{}()", self.class(), self.name()).into(),
            ));
        }
        check_access(self.visibility(), self.accessible.get(), &self.class(), self.name())
    }

    /// The `<user, …>` annotations of the string form.
    fn annotations(&self) -> Vec<String> {
        let slot = self.slot();
        let mut notes = Vec::new();

        if !slot.declaring.same(&self.reflected) {
            notes.push(format!("inherits {}", slot.declaring.fqn()));
        } else if let Some(parent) = slot.declaring.parent_name()
            && let Ok(parent_class) = ReflectionClass::new(&self.engine, &parent)
            && let Ok(Some(overridden)) = parent_class.find_method(self.name())
            && !overridden.is_private()
        {
            notes.push(format!("overwrites {}", overridden.class()));
        }

        if let Ok(Some(proto)) = self.prototype() {
            notes.push(format!("prototype {}", proto.class()));
        }
        if self.is_constructor() {
            notes.push("ctor".to_string());
        }
        notes
    }

    /// Render like PHP's `ReflectionMethod::__toString` at `indent`.
    pub(crate) fn render(&self, out: &mut String, indent: &str) {
        render::function_string(out, &self.engine, &self.callable(), &self.annotations(), indent);
    }
}

impl ValueAccessible for ReflectionMethod {
    fn set_accessible(&self, accessible: bool) {
        self.accessible.set(accessible);
    }

    fn is_accessible(&self) -> bool {
        self.accessible.get()
    }

    fn live_handle(&self) -> Result<LiveHandle> {
        let bridge = self.engine.require_bridge("ReflectionMethod")?;
        let declaring = &self.slot().declaring;
        bridge.handle(&declaring.fqn(), &declaring.file.path)
    }
}

impl fmt::Display for ReflectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, "");
        f.write_str(&out)
    }
}

impl fmt::Debug for ReflectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionMethod")
            .field("class", &self.class())
            .field("name", &self.name())
            .finish()
    }
}

impl Snapshot for ReflectionMethod {
    fn snapshot(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name().to_string()), ("class", self.class())]
    }
}
