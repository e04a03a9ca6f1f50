//! Host seams: invocable values and the native function registry.

use crate::error::{HostException, RuntimeError};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Anything that can be called with positional arguments.
///
/// Interpreted closures, promoted closures and host callbacks all implement
/// this, so a caller never needs to know which execution strategy runs.
pub trait Invocable: Send + Sync {
    /// Invoke with `args`, returning the result or the error that escaped.
    fn call(&self, args: &[Value]) -> Result<Value, RuntimeError>;

    /// Diagnostic name
    fn name(&self) -> &str {
        "<anonymous>"
    }
}

/// An externally defined function.
///
/// Closures of the right shape implement this automatically.
pub trait NativeFunction: Send + Sync {
    /// Call the function. Exceptions raised here are catchable by
    /// interpreted handler regions.
    fn invoke(&self, args: &[Value]) -> Result<Value, HostException>;
}

impl<F> NativeFunction for F
where
    F: Fn(&[Value]) -> Result<Value, HostException> + Send + Sync,
{
    fn invoke(&self, args: &[Value]) -> Result<Value, HostException> {
        self(args)
    }
}

/// Opaque key of a registered native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u32);

/// A registered native function and its calling shape.
#[derive(Clone)]
pub struct NativeEntry {
    /// Registered name
    pub name: Arc<str>,
    /// Exact number of arguments
    pub arity: usize,
    /// Whether a call pushes a result
    pub returns_value: bool,
    /// The function itself
    pub function: Arc<dyn NativeFunction>,
}

impl fmt::Debug for NativeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEntry")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("returns_value", &self.returns_value)
            .finish()
    }
}

/// Registry of native functions, built once by the host and passed to the
/// compiler by reference.
///
/// # Examples
///
/// ```
/// use core_types::{NativeRegistry, Value};
///
/// let mut registry = NativeRegistry::new();
/// let double = registry.register("double", 1, true, |args: &[Value]| {
///     Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
/// });
///
/// let entry = registry.get(double).unwrap();
/// assert_eq!(entry.function.invoke(&[Value::Int(21)]).unwrap(), Value::Int(42));
/// assert_eq!(registry.lookup("double"), Some(double));
/// ```
#[derive(Debug, Default, Clone)]
pub struct NativeRegistry {
    entries: Vec<NativeEntry>,
    by_name: HashMap<Arc<str>, NativeHandle>,
}

impl NativeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function and return its handle.
    ///
    /// Registering a name twice keeps both entries; lookups by name return
    /// the latest.
    pub fn register<F>(
        &mut self,
        name: &str,
        arity: usize,
        returns_value: bool,
        function: F,
    ) -> NativeHandle
    where
        F: Fn(&[Value]) -> Result<Value, HostException> + Send + Sync + 'static,
    {
        let handle = NativeHandle(self.entries.len() as u32);
        let name: Arc<str> = Arc::from(name);
        self.entries.push(NativeEntry {
            name: name.clone(),
            arity,
            returns_value,
            function: Arc::new(function),
        });
        self.by_name.insert(name, handle);
        handle
    }

    /// Entry for `handle`
    pub fn get(&self, handle: NativeHandle) -> Option<&NativeEntry> {
        self.entries.get(handle.0 as usize)
    }

    /// Handle registered under `name`
    pub fn lookup(&self, name: &str) -> Option<NativeHandle> {
        self.by_name.get(name).copied()
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
