//! Live fallback bridge.
//!
//! Metadata never needs a running interpreter, but invoking a method,
//! reading a property value, or creating an instance does.  The embedding
//! application supplies a [`LiveRuntime`]; the engine wraps it in a
//! [`LiveBridge`] that loads each declaring file exactly once and enforces
//! visibility before delegating.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ReflectionError, Result, RuntimeError};
use crate::types::Visibility;
use crate::value::Value;

/// Opaque reference to a symbol loaded in the live runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiveHandle {
    /// Fully-qualified name of the class or function.
    pub name: String,
    /// Runtime-specific identifier.
    pub id: u64,
}

/// What an invocation targets on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member<'a> {
    /// The function the handle refers to.
    Function,
    Method(&'a str),
}

/// Hooks into a running PHP interpreter.
///
/// `load` must be idempotent.  Every other method may assume the file
/// declaring the target has been loaded.
pub trait LiveRuntime: Send + Sync {
    fn load(&self, path: &Path) -> std::result::Result<(), RuntimeError>;

    fn handle(&self, fqn: &str) -> Option<LiveHandle>;

    fn invoke(
        &self,
        target: &LiveHandle,
        member: Member<'_>,
        this: Option<&Value>,
        args: &[Value],
    ) -> std::result::Result<Value, RuntimeError>;

    /// Read a property; `this` is `None` for static properties.
    fn get_property(
        &self,
        class: &LiveHandle,
        property: &str,
        this: Option<&Value>,
    ) -> std::result::Result<Value, RuntimeError>;

    fn set_property(
        &self,
        class: &LiveHandle,
        property: &str,
        this: Option<&Value>,
        value: Value,
    ) -> std::result::Result<(), RuntimeError>;

    /// Create an instance.  `args` is `None` to skip the constructor.
    fn instantiate(
        &self,
        class: &LiveHandle,
        args: Option<&[Value]>,
    ) -> std::result::Result<Value, RuntimeError>;

    fn constant(&self, name: &str) -> Option<Value>;

    /// Whether a typed property holds a value.  Runtimes that cannot tell
    /// report every property as initialized.
    fn is_initialized(
        &self,
        _class: &LiveHandle,
        _property: &str,
        _this: Option<&Value>,
    ) -> std::result::Result<bool, RuntimeError> {
        Ok(true)
    }
}

/// The engine's view of an attached [`LiveRuntime`].
#[derive(Clone)]
pub struct LiveBridge {
    runtime: Arc<dyn LiveRuntime>,
    loaded: Arc<Mutex<HashSet<PathBuf>>>,
}

impl fmt::Debug for LiveBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveBridge")
            .field("loaded", &self.loaded.lock().len())
            .finish()
    }
}

impl LiveBridge {
    pub fn new(runtime: Arc<dyn LiveRuntime>) -> Self {
        Self {
            runtime,
            loaded: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Load `path` into the runtime unless that already happened.
    pub fn ensure_loaded(&self, path: &Path) -> Result<()> {
        let mut loaded = self.loaded.lock();
        if loaded.contains(path) {
            return Ok(());
        }
        tracing::debug!("loading {} into the live runtime", path.display());
        self.runtime.load(path).map_err(ReflectionError::Runtime)?;
        loaded.insert(path.to_path_buf());
        Ok(())
    }

    /// Load the declaring file, then look up the live symbol.
    pub fn handle(&self, fqn: &str, declared_in: &Path) -> Result<LiveHandle> {
        self.ensure_loaded(declared_in)?;
        self.runtime
            .handle(fqn)
            .ok_or_else(|| ReflectionError::SymbolNotFound(fqn.to_string()))
    }

    pub fn invoke(
        &self,
        target: &LiveHandle,
        member: Member<'_>,
        this: Option<&Value>,
        args: &[Value],
    ) -> Result<Value> {
        self.runtime
            .invoke(target, member, this, args)
            .map_err(ReflectionError::Runtime)
    }

    pub fn get_property(&self, class: &LiveHandle, property: &str, this: Option<&Value>) -> Result<Value> {
        self.runtime
            .get_property(class, property, this)
            .map_err(ReflectionError::Runtime)
    }

    pub fn set_property(
        &self,
        class: &LiveHandle,
        property: &str,
        this: Option<&Value>,
        value: Value,
    ) -> Result<()> {
        self.runtime
            .set_property(class, property, this, value)
            .map_err(ReflectionError::Runtime)
    }

    pub fn is_initialized(&self, class: &LiveHandle, property: &str, this: Option<&Value>) -> Result<bool> {
        self.runtime
            .is_initialized(class, property, this)
            .map_err(ReflectionError::Runtime)
    }

    pub fn instantiate(&self, class: &LiveHandle, args: Option<&[Value]>) -> Result<Value> {
        self.runtime
            .instantiate(class, args)
            .map_err(ReflectionError::Runtime)
    }

    pub fn constant(&self, name: &str) -> Option<Value> {
        self.runtime.constant(name)
    }
}

/// Fail with `AccessDenied` for a non-public member that was not made
/// accessible.
pub fn check_access(visibility: Visibility, accessible: bool, class: &str, member: &str) -> Result<()> {
    if visibility == Visibility::Public || accessible {
        Ok(())
    } else {
        Err(ReflectionError::AccessDenied {
            class: class.to_string(),
            member: member.to_string(),
        })
    }
}

/// Capability of entities that can reach their live counterpart.
pub trait ValueAccessible {
    fn set_accessible(&self, accessible: bool);

    fn is_accessible(&self) -> bool;

    /// The live handle of the declaring symbol, loading its file on demand.
    fn live_handle(&self) -> Result<LiveHandle>;
}

/// A callable obtained from `closure()`, bound to an optional `$this`.
#[derive(Debug, Clone)]
pub struct CallableHandle {
    bridge: LiveBridge,
    target: LiveHandle,
    method: Option<String>,
    this: Option<Value>,
}

impl CallableHandle {
    pub(crate) fn new(bridge: LiveBridge, target: LiveHandle, method: Option<String>, this: Option<Value>) -> Self {
        Self {
            bridge,
            target,
            method,
            this,
        }
    }

    pub fn target(&self) -> &LiveHandle {
        &self.target
    }

    pub fn bound_this(&self) -> Option<&Value> {
        self.this.as_ref()
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let member = match &self.method {
            Some(name) => Member::Method(name),
            None => Member::Function,
        };
        self.bridge.invoke(&self.target, member, self.this.as_ref(), args)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingRuntime {
        loads: AtomicUsize,
    }

    impl LiveRuntime for CountingRuntime {
        fn load(&self, _path: &Path) -> std::result::Result<(), RuntimeError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn handle(&self, fqn: &str) -> Option<LiveHandle> {
            (fqn == "Known").then(|| LiveHandle {
                name: fqn.to_string(),
                id: 1,
            })
        }

        fn invoke(
            &self,
            _target: &LiveHandle,
            _member: Member<'_>,
            _this: Option<&Value>,
            _args: &[Value],
        ) -> std::result::Result<Value, RuntimeError> {
            Err("boom".into())
        }

        fn get_property(&self, _: &LiveHandle, _: &str, _: Option<&Value>) -> std::result::Result<Value, RuntimeError> {
            Ok(Value::Null)
        }

        fn set_property(&self, _: &LiveHandle, _: &str, _: Option<&Value>, _: Value) -> std::result::Result<(), RuntimeError> {
            Ok(())
        }

        fn instantiate(&self, _: &LiveHandle, _: Option<&[Value]>) -> std::result::Result<Value, RuntimeError> {
            Ok(Value::Null)
        }

        fn constant(&self, _: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn files_are_loaded_once() {
        let runtime = Arc::new(CountingRuntime::default());
        let bridge = LiveBridge::new(runtime.clone());
        let path = Path::new("/src/Known.php");

        assert!(bridge.handle("Known", path).is_ok());
        assert!(bridge.handle("Known", path).is_ok());
        assert_eq!(runtime.loads.load(Ordering::SeqCst), 1);

        let missing = bridge.handle("Missing", path).unwrap_err();
        assert!(matches!(missing, ReflectionError::SymbolNotFound(_)));
    }

    #[test]
    fn runtime_failures_pass_through() {
        let bridge = LiveBridge::new(Arc::new(CountingRuntime::default()));
        let handle = LiveHandle {
            name: "Known".into(),
            id: 1,
        };
        let err = bridge.invoke(&handle, Member::Function, None, &[]).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn access_gate() {
        assert!(check_access(Visibility::Public, false, "A", "f").is_ok());
        assert!(check_access(Visibility::Private, true, "A", "f").is_ok());
        assert!(matches!(
            check_access(Visibility::Protected, false, "A", "f"),
            Err(ReflectionError::AccessDenied { .. })
        ));
    }
}
