//! Closure cells
//!
//! A closure cell is the heap box behind a captured variable. The enclosing
//! activation and every nested closure that captured the variable hold a
//! clone of the same cell, so a write through any of them is observed by all.

use crate::value::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Shared mutable box for one captured variable.
///
/// Cloning a cell clones the handle, not the value.
#[derive(Clone, Default)]
pub struct ClosureCell(Arc<RwLock<Value>>);

impl ClosureCell {
    /// Create a new cell holding `value`
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Read the current value
    pub fn get(&self) -> Value {
        self.0.read().clone()
    }

    /// Replace the current value
    pub fn set(&self, value: Value) {
        *self.0.write() = value;
    }

    /// Check whether two handles refer to the same cell
    pub fn ptr_eq(&self, other: &ClosureCell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ClosureCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Some(value) => write!(f, "ClosureCell({:?})", *value),
            None => write!(f, "ClosureCell(<locked>)"),
        }
    }
}
