//! The reflection object model.
//!
//! Entities are thin views: an `Arc` of the parsed file plus the position
//! of a node in it, and the engine handle for lazy lookups.  Metadata
//! getters only read the tree; value-level operations (`invoke`,
//! `value`, `new_instance`, …) go through the engine's live runtime.

mod class;
mod class_constant;
mod file;
mod function;
mod method;
mod parameter;
mod property;
mod render;
mod types;

pub use class::ReflectionClass;
pub use class_constant::ReflectionClassConstant;
pub use file::{ReflectionFile, ReflectionFileNamespace};
pub use function::ReflectionFunction;
pub use method::ReflectionMethod;
pub use parameter::ReflectionParameter;
pub use property::ReflectionProperty;
pub use types::{NamedType, ReflectionType};

use serde::ser::{Serialize, SerializeMap, Serializer};

// Modifier bits, as reported by PHP's `getModifiers()`.
pub const IS_PUBLIC: u32 = 1;
pub const IS_PROTECTED: u32 = 2;
pub const IS_PRIVATE: u32 = 4;
pub const IS_STATIC: u32 = 16;
pub const IS_FINAL: u32 = 32;
pub const IS_ABSTRACT: u32 = 64;
pub const IS_READONLY: u32 = 128;

pub const IS_IMPLICIT_ABSTRACT: u32 = 16;
pub const IS_EXPLICIT_ABSTRACT: u32 = 64;
pub const IS_READONLY_CLASS: u32 = 65536;

/// The ordered field list PHP produces for `(array) $reflector`.
pub trait Snapshot {
    fn snapshot(&self) -> Vec<(&'static str, String)>;

    /// The snapshot as a JSON object, keys in snapshot order.
    fn snapshot_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(&OrderedFields(self.snapshot()))?)
    }
}

struct OrderedFields(Vec<(&'static str, String)>);

impl Serialize for OrderedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn visibility_bits(visibility: crate::types::Visibility) -> u32 {
    match visibility {
        crate::types::Visibility::Public => IS_PUBLIC,
        crate::types::Visibility::Protected => IS_PROTECTED,
        crate::types::Visibility::Private => IS_PRIVATE,
    }
}
