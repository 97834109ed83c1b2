//! Error taxonomy of the reflection engine.
//!
//! Metadata queries fail only with lookup, parse, or inheritance errors.
//! `Runtime` is reserved for failures that originate in the live runtime
//! (code executed while loading a symbol or invoking a member); those are
//! passed through untouched.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error type returned by [`crate::runtime::LiveRuntime`] implementations.
pub type RuntimeError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ReflectionError {
    #[error("syntax error in {path} on line {line}: {message}")]
    Syntax {
        path: PathBuf,
        line: u32,
        message: String,
    },
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("symbol \"{0}\" could not be located")]
    SymbolNotFound(String),
    #[error("class \"{0}\" does not exist")]
    ClassNotFound(String),
    #[error("method {class}::{method}() does not exist")]
    MethodNotFound { class: String, method: String },
    #[error("property {class}::${property} does not exist")]
    PropertyNotFound { class: String, property: String },
    #[error("constant {class}::{constant} does not exist")]
    ClassConstantNotFound { class: String, constant: String },
    #[error("function {0}() does not exist")]
    FunctionNotFound(String),
    #[error("constant \"{0}\" is not defined")]
    ConstantNotFound(String),
    #[error("circular inheritance detected for {class}: {}", chain.join(" -> "))]
    CircularInheritance { class: String, chain: Vec<String> },
    #[error("unsupported constant expression: {0}")]
    UnsupportedExpression(String),
    #[error("cannot access non-public member {class}::{member}")]
    AccessDenied { class: String, member: String },
    #[error("{0} requires a live runtime, but none is attached")]
    NoRuntime(String),
    #[error(transparent)]
    Runtime(RuntimeError),
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReflectionError>;

impl ReflectionError {
    /// Lookup failures are recoverable: the caller decides the fallback.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ReflectionError::SymbolNotFound(_)
                | ReflectionError::ClassNotFound(_)
                | ReflectionError::MethodNotFound { .. }
                | ReflectionError::PropertyNotFound { .. }
                | ReflectionError::ClassConstantNotFound { .. }
                | ReflectionError::FunctionNotFound(_)
                | ReflectionError::ConstantNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_failures_are_errors() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ReflectionError::from(source);
        assert!(matches!(err, ReflectionError::Json(_)));
        assert!(err.to_string().starts_with("failed to serialize output"));
        assert!(!err.is_not_found());
    }
}
