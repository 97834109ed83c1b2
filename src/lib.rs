//! Static reflection for PHP source code.
//!
//! Answers the questions PHP's Reflection API answers (what methods does
//! this class have, what is the default of this parameter, which interface
//! declared this method first) by parsing source files instead of loading
//! them.  Nothing is executed for metadata queries; operations that need
//! real values (`invoke`, property values, instantiation) go through an
//! optional [`LiveRuntime`] supplied by the embedder.
//!
//! ```no_run
//! use phpantom_reflection::{EngineConfig, ReflectionEngine};
//!
//! let config = EngineConfig::discover(std::path::Path::new("."))?;
//! let engine = ReflectionEngine::from_config(&config)?;
//! let class = engine.class("App\\Model\\User")?;
//! for method in class.methods(None)? {
//!     println!("{}::{}", method.class(), method.name());
//! }
//! # Ok::<(), phpantom_reflection::ReflectionError>(())
//! ```

pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod inheritance;
pub mod locator;
pub mod parser;
pub mod reflection;
pub mod resolution;
pub mod runtime;
pub mod source_cache;
pub mod types;
pub mod value;

pub use config::EngineConfig;
pub use engine::{EngineBuilder, ReflectionEngine};
pub use error::{ReflectionError, Result};
pub use locator::{ChainLocator, ClassMapLocator, ComposerLocator, ScanningLocator, SymbolLocator};
pub use reflection::{
    NamedType, ReflectionClass, ReflectionClassConstant, ReflectionFile, ReflectionFileNamespace,
    ReflectionFunction, ReflectionMethod, ReflectionParameter, ReflectionProperty, ReflectionType,
    Snapshot,
};
pub use runtime::{CallableHandle, LiveHandle, LiveRuntime, Member, ValueAccessible};
pub use value::{ArrayKey, PhpArray, Value};
