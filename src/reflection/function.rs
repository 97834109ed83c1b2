use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

use crate::engine::ReflectionEngine;
use crate::error::Result;
use crate::evaluator::{Scope, try_evaluate};
use crate::index::DeclRef;
use crate::inheritance::{ClassDecl, MethodSlot};
use crate::resolution::NamespaceContext;
use crate::runtime::{CallableHandle, LiveHandle, Member, ValueAccessible};
use crate::source_cache::ParsedFile;
use crate::types::{FunctionLikeNode, qualify};
use crate::value::Value;

use super::render;
use super::{ReflectionParameter, ReflectionType, Snapshot};

/// A method or a function: whatever owns a parameter list.
#[derive(Debug, Clone)]
pub(crate) enum Callable {
    Method(MethodSlot),
    Function { file: Arc<ParsedFile>, decl: DeclRef },
}

impl Callable {
    pub(crate) fn node(&self) -> &FunctionLikeNode {
        match self {
            Callable::Method(slot) => slot.node(),
            Callable::Function { file, decl } => {
                &file.ast.namespaces[decl.namespace].functions[decl.index]
            }
        }
    }

    /// The file holding the node (the trait's file for trait methods).
    pub(crate) fn file(&self) -> &Arc<ParsedFile> {
        match self {
            Callable::Method(slot) => &slot.owner.file,
            Callable::Function { file, .. } => file,
        }
    }

    pub(crate) fn context(&self) -> NamespaceContext {
        match self {
            Callable::Method(slot) => slot.owner.context(),
            Callable::Function { file, decl } => {
                NamespaceContext::from_node(&file.ast.namespaces[decl.namespace])
            }
        }
    }

    /// The name PHP reports: the visible method name, or the function FQN.
    pub(crate) fn name(&self) -> String {
        match self {
            Callable::Method(slot) => slot.name.clone(),
            Callable::Function { file, decl } => {
                let ns = &file.ast.namespaces[decl.namespace];
                qualify(&ns.name, &ns.functions[decl.index].name)
            }
        }
    }

    pub(crate) fn declaring_class(&self) -> Option<&ClassDecl> {
        match self {
            Callable::Method(slot) => Some(&slot.declaring),
            Callable::Function { .. } => None,
        }
    }

    pub(crate) fn scope(&self) -> Scope {
        match self {
            Callable::Method(slot) => {
                let mut scope = slot.owner.scope(Some(&slot.node().name));
                if !slot.owner.same(&slot.declaring) {
                    scope.class = Some(slot.declaring.fqn());
                    scope.parent = slot.declaring.parent_name();
                }
                scope
            }
            Callable::Function { file, decl } => {
                let mut scope = Scope::for_namespace(&file.path, &file.ast.namespaces[decl.namespace]);
                scope.function = Some(self.name());
                scope
            }
        }
    }

    /// PHP counts every parameter up to the last required one as required.
    pub(crate) fn required_parameters(&self) -> usize {
        self.node()
            .parameters
            .iter()
            .rposition(|p| p.default.is_none() && !p.is_variadic)
            .map_or(0, |i| i + 1)
    }

    pub(crate) fn parameters(&self, engine: &ReflectionEngine) -> Vec<ReflectionParameter> {
        (0..self.node().parameters.len())
            .map(|index| ReflectionParameter::from_callable(engine, self.clone(), index))
            .collect()
    }

    pub(crate) fn return_type(&self) -> Option<ReflectionType> {
        self.node()
            .return_type
            .as_ref()
            .map(|hint| ReflectionType::from_hint(hint, &self.context(), false))
    }

    pub(crate) fn is_variadic(&self) -> bool {
        self.node().parameters.iter().any(|p| p.is_variadic)
    }

    /// Static variables with their initial values (`None` when the
    /// initializer cannot be evaluated statically).
    pub(crate) fn static_variables(&self, engine: &ReflectionEngine) -> Vec<(String, Option<Value>)> {
        let scope = self.scope();
        self.node()
            .static_variables
            .iter()
            .map(|var| {
                let value = match &var.value {
                    Some(expr) => try_evaluate(engine, self.file(), expr, &scope),
                    None => Some(Value::Null),
                };
                (var.name.clone(), value)
            })
            .collect()
    }
}

/// A standalone function.
pub struct ReflectionFunction {
    engine: ReflectionEngine,
    callable: Callable,
    accessible: Cell<bool>,
}

impl ReflectionFunction {
    /// Reflect the function `name` (fully qualified; a leading `\` is
    /// accepted).  Fails with `FunctionNotFound`.
    pub fn new(engine: &ReflectionEngine, name: &str) -> Result<Self> {
        let (file, decl) = engine.locate_function(name)?;
        Ok(Self::from_decl(engine, file, decl))
    }

    pub(crate) fn from_decl(engine: &ReflectionEngine, file: Arc<ParsedFile>, decl: DeclRef) -> Self {
        Self {
            engine: engine.clone(),
            callable: Callable::Function { file, decl },
            accessible: Cell::new(false),
        }
    }

    fn node(&self) -> &FunctionLikeNode {
        self.callable.node()
    }

    pub fn name(&self) -> String {
        self.callable.name()
    }

    pub fn short_name(&self) -> &str {
        &self.node().name
    }

    pub fn namespace_name(&self) -> &str {
        match &self.callable {
            Callable::Function { file, decl } => &file.ast.namespaces[decl.namespace].name,
            Callable::Method(_) => "",
        }
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
        &self.callable.file().path
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

    pub fn is_closure(&self) -> bool {
        false
    }

    pub fn is_deprecated(&self) -> bool {
        false
    }

    pub fn is_generator(&self) -> bool {
        self.node().is_generator
    }

    pub fn is_variadic(&self) -> bool {
        self.callable.is_variadic()
    }

    pub fn returns_reference(&self) -> bool {
        self.node().returns_reference
    }

    pub fn has_return_type(&self) -> bool {
        self.node().return_type.is_some()
    }

    pub fn return_type(&self) -> Option<ReflectionType> {
        self.callable.return_type()
    }

    pub fn number_of_parameters(&self) -> usize {
        self.node().parameters.len()
    }

    pub fn number_of_required_parameters(&self) -> usize {
        self.callable.required_parameters()
    }

    pub fn parameters(&self) -> Vec<ReflectionParameter> {
        self.callable.parameters(&self.engine)
    }

    pub fn static_variables(&self) -> Vec<(String, Option<Value>)> {
        self.callable.static_variables(&self.engine)
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        self.invoke_args(args)
    }

    pub fn invoke_args(&self, args: &[Value]) -> Result<Value> {
        let bridge = self.engine.require_bridge("ReflectionFunction::invoke")?;
        let handle = self.live_handle()?;
        bridge.invoke(&handle, Member::Function, None, args)
    }

    pub fn closure(&self) -> Result<CallableHandle> {
        let bridge = self.engine.require_bridge("ReflectionFunction::getClosure")?;
        let handle = self.live_handle()?;
        Ok(CallableHandle::new(bridge.clone(), handle, None, None))
    }

}

impl std::fmt::Display for ReflectionFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        render::function_string(&mut out, &self.engine, &self.callable, &[], "");
        f.write_str(&out)
    }
}

impl ValueAccessible for ReflectionFunction {
    fn set_accessible(&self, accessible: bool) {
        self.accessible.set(accessible);
    }

    fn is_accessible(&self) -> bool {
        self.accessible.get()
    }

    fn live_handle(&self) -> Result<LiveHandle> {
        let bridge = self.engine.require_bridge("ReflectionFunction")?;
        bridge.handle(&self.name(), self.file_name())
    }
}

impl Snapshot for ReflectionFunction {
    fn snapshot(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name())]
    }
}

impl std::fmt::Debug for ReflectionFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionFunction")
            .field("name", &self.name())
            .finish()
    }
}
