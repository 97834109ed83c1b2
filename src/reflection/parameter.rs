use std::fmt;

use crate::engine::ReflectionEngine;
use crate::error::Result;
use crate::evaluator::try_evaluate;
use crate::types::{Expr, ParameterNode};
use crate::value::Value;

use super::function::Callable;
use super::render;
use super::{ReflectionClass, ReflectionType, Snapshot};

/// One parameter of a method or function.
pub struct ReflectionParameter {
    engine: ReflectionEngine,
    callable: Callable,
    index: usize,
}

impl ReflectionParameter {
    pub(crate) fn from_callable(engine: &ReflectionEngine, callable: Callable, index: usize) -> Self {
        Self {
            engine: engine.clone(),
            callable,
            index,
        }
    }

    fn node(&self) -> &ParameterNode {
        &self.callable.node().parameters[self.index]
    }

    pub fn name(&self) -> &str {
        &self.node().name
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn has_type(&self) -> bool {
        self.node().type_hint.is_some()
    }

    /// The declared type.  A `null` default makes a plain type nullable.
    pub fn ty(&self) -> Option<ReflectionType> {
        let implicit_null = matches!(self.node().default, Some(Expr::Null));
        self.node()
            .type_hint
            .as_ref()
            .map(|hint| ReflectionType::from_hint(hint, &self.callable.context(), implicit_null))
    }

    pub fn allows_null(&self) -> bool {
        self.ty().is_none_or(|ty| ty.allows_null())
    }

    pub fn is_optional(&self) -> bool {
        self.index >= self.callable.required_parameters()
    }

    pub fn is_default_value_available(&self) -> bool {
        self.node().default.is_some() && self.is_optional()
    }

    /// The evaluated default, `None` when there is none or it cannot be
    /// computed without running code.
    pub fn default_value(&self) -> Option<Value> {
        if !self.is_default_value_available() {
            return None;
        }
        let expr = self.node().default.as_ref()?;
        try_evaluate(&self.engine, self.callable.file(), expr, &self.callable.scope())
    }

    pub fn is_default_value_constant(&self) -> bool {
        self.is_default_value_available()
            && matches!(
                self.node().default,
                Some(Expr::Constant(_) | Expr::ClassConstant { .. })
            )
    }

    /// The constant a default value refers to: `NS\NAME` for global
    /// constants (the first candidate that is defined), `Class::NAME` for
    /// class constants, with `self`/`static`/`parent` kept as written.
    pub fn default_value_constant_name(&self) -> Option<String> {
        if !self.is_default_value_available() {
            return None;
        }
        match self.node().default.as_ref()? {
            Expr::Constant(name) => {
                let candidates = self.callable.context().resolve_constant(name);
                let defined = candidates
                    .iter()
                    .find(|fqn| self.engine.locate_constant(fqn).is_ok())
                    .or(candidates.last());
                defined.cloned()
            }
            Expr::ClassConstant { class, name } => {
                let lower = class.to_ascii_lowercase();
                let class = if matches!(lower.as_str(), "self" | "static" | "parent") {
                    class.clone()
                } else {
                    self.callable.context().resolve_class(class)
                };
                Some(format!("{}::{}", class, name))
            }
            _ => None,
        }
    }

    /// Source text of the default value, as written.
    pub fn default_value_source(&self) -> Option<&str> {
        self.node().default_source.as_deref()
    }

    pub fn is_passed_by_reference(&self) -> bool {
        self.node().is_reference
    }

    pub fn can_be_passed_by_value(&self) -> bool {
        !self.node().is_reference
    }

    pub fn is_variadic(&self) -> bool {
        self.node().is_variadic
    }

    pub fn is_array(&self) -> bool {
        self.ty().and_then(|ty| ty.name().map(|n| n == "array")).unwrap_or(false)
    }

    pub fn is_callable(&self) -> bool {
        self.ty().and_then(|ty| ty.name().map(|n| n == "callable")).unwrap_or(false)
    }

    pub fn is_promoted(&self) -> bool {
        self.node().promoted.is_some()
    }

    /// The class of a class-typed parameter.
    pub fn class(&self) -> Result<Option<ReflectionClass>> {
        let Some(ty) = self.ty() else {
            return Ok(None);
        };
        let Some(name) = ty.name().filter(|_| !ty.is_builtin()) else {
            return Ok(None);
        };

        let fqn = match (name, self.callable.declaring_class()) {
            ("self" | "static", Some(class)) => class.fqn(),
            ("parent", Some(class)) => match class.parent_name() {
                Some(parent) => parent,
                None => return Ok(None),
            },
            _ => name.to_string(),
        };
        ReflectionClass::new(&self.engine, &fqn).map(Some)
    }

    pub fn declaring_function_name(&self) -> String {
        self.callable.name()
    }

    pub fn declaring_class(&self) -> Option<ReflectionClass> {
        self.callable
            .declaring_class()
            .map(|decl| ReflectionClass::from_decl(&self.engine, decl.clone()))
    }

    pub(crate) fn default_repr(&self) -> Option<String> {
        if !self.is_default_value_available() || self.is_variadic() {
            return None;
        }
        let expr = self.node().default.as_ref()?;
        Some(render::default_value(
            &self.engine,
            self.callable.file(),
            expr,
            self.node().default_source.as_deref(),
            &self.callable.scope(),
        ))
    }
}

impl fmt::Display for ReflectionParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::parameter_string(self))
    }
}

impl fmt::Debug for ReflectionParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionParameter")
            .field("function", &self.callable.name())
            .field("name", &self.name())
            .field("position", &self.index)
            .finish()
    }
}

impl Snapshot for ReflectionParameter {
    fn snapshot(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name().to_string())]
    }
}
