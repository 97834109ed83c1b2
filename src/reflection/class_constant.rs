use std::fmt;

use crate::engine::ReflectionEngine;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::inheritance::ConstantSlot;
use crate::types::{ClassConstantNode, Visibility};
use crate::value::Value;

use super::render;
use super::{IS_FINAL, ReflectionClass, Snapshot, visibility_bits};

/// A class constant or enum case.
pub struct ReflectionClassConstant {
    engine: ReflectionEngine,
    slot: ConstantSlot,
}

impl ReflectionClassConstant {
    pub fn new(engine: &ReflectionEngine, class: &str, name: &str) -> Result<Self> {
        ReflectionClass::new(engine, class)?.reflection_constant(name)
    }

    pub(crate) fn from_slot(engine: &ReflectionEngine, slot: ConstantSlot) -> Self {
        Self {
            engine: engine.clone(),
            slot,
        }
    }

    fn node(&self) -> &ClassConstantNode {
        self.slot.node()
    }

    pub fn name(&self) -> &str {
        &self.node().name
    }

    pub fn class(&self) -> String {
        self.slot.declaring.fqn()
    }

    pub fn declaring_class(&self) -> ReflectionClass {
        ReflectionClass::from_decl(&self.engine, self.slot.declaring.clone())
    }

    /// The evaluated value.  Enum cases evaluate to [`Value::EnumCase`].
    pub fn value(&self) -> Result<Value> {
        Evaluator::new(&self.engine).constant_slot(&self.slot)
    }

    pub fn visibility(&self) -> Visibility {
        self.node().visibility
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

    pub fn is_final(&self) -> bool {
        self.node().is_final
    }

    pub fn is_enum_case(&self) -> bool {
        self.node().is_enum_case
    }

    pub fn modifiers(&self) -> u32 {
        let mut bits = visibility_bits(self.visibility());
        if self.is_final() {
            bits |= IS_FINAL;
        }
        bits
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
}

impl fmt::Display for ReflectionClassConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        render::constant_string(&mut out, self, "");
        f.write_str(&out)
    }
}

impl fmt::Debug for ReflectionClassConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionClassConstant")
            .field("class", &self.class())
            .field("name", &self.name())
            .finish()
    }
}

impl Snapshot for ReflectionClassConstant {
    fn snapshot(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name().to_string()), ("class", self.class())]
    }
}
