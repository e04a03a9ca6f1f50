//! Dynamic value representation.
//!
//! This module provides the `Value` enum that flows through stack frames,
//! closure cells and native calls. Aggregates are shared by reference so a
//! value can cross thread boundaries together with the frame that owns it.

use crate::cell::ClosureCell;
use crate::error::HostException;
use crate::native::Invocable;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared, mutable array storage.
pub type ArrayRef = Arc<RwLock<Vec<Value>>>;

/// Shared, mutable object storage keyed by field name.
pub type ObjectRef = Arc<RwLock<HashMap<Arc<str>, Value>>>;

/// Represents any value the interpreter manipulates.
///
/// Primitive values are stored inline, everything else is reference counted.
/// Equality is structural for primitives and by identity for references.
///
/// # Examples
///
/// ```
/// use core_types::{Value, ValueKind};
///
/// let nil = Value::Nil;
/// let number = Value::Int(42);
/// let text = Value::from("hello");
///
/// assert!(!nil.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(text.kind(), ValueKind::String);
/// ```
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Nil,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Int(i64),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// Immutable string
    String(Arc<str>),
    /// Array of values
    Array(ArrayRef),
    /// Object with named fields
    Object(ObjectRef),
    /// Callable value (a closure or a host function)
    Function(Arc<dyn Invocable>),
    /// A closure cell handed around as a first-class value
    Cell(ClosureCell),
    /// An exception object as seen by a catch handler
    Exception(HostException),
}

/// The dynamic kind of a [`Value`].
///
/// Used as a type hint by typed comparisons and in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Nil`]
    Nil,
    /// [`Value::Boolean`]
    Boolean,
    /// [`Value::Int`]
    Int,
    /// [`Value::Double`]
    Double,
    /// [`Value::String`]
    String,
    /// [`Value::Array`]
    Array,
    /// [`Value::Object`]
    Object,
    /// [`Value::Function`]
    Function,
    /// [`Value::Cell`]
    Cell,
    /// [`Value::Exception`]
    Exception,
}

impl ValueKind {
    /// Human readable name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Function => "function",
            ValueKind::Cell => "cell",
            ValueKind::Exception => "exception",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Double(n) => f.debug_tuple("Double").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(&*items.read()).finish(),
            Value::Object(fields) => write!(f, "Object({} fields)", fields.read().len()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Cell(cell) => f.debug_tuple("Cell").field(cell).finish(),
            Value::Exception(exc) => f.debug_tuple("Exception").field(exc).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(_) => write!(f, "<object>"),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Cell(cell) => write!(f, "<cell {}>", cell.get()),
            Value::Exception(exc) => write!(f, "{}", exc),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Cell(a), Value::Cell(b)) => a.ptr_eq(b),
            (Value::Exception(a), Value::Exception(b)) => a.same_identity(b),
            _ => false,
        }
    }
}

impl Value {
    /// Creates a new array value owning `items`.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(RwLock::new(items)))
    }

    /// Creates a new object value from name/value pairs.
    ///
    /// When a name repeats, the last pair wins.
    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (Arc<str>, Value)>,
    {
        Value::Object(Arc::new(RwLock::new(fields.into_iter().collect())))
    }

    /// Returns the dynamic kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Function(_) => ValueKind::Function,
            Value::Cell(_) => ValueKind::Cell,
            Value::Exception(_) => ValueKind::Exception,
        }
    }

    /// Returns whether this value counts as true in a condition.
    ///
    /// `nil`, `false`, zero, NaN and the empty string are falsy, everything
    /// else is truthy.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(!Value::Nil.is_truthy());
    /// assert!(!Value::Int(0).is_truthy());
    /// assert!(!Value::Double(f64::NAN).is_truthy());
    /// assert!(Value::from("x").is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Double(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the cell, if this value is one.
    pub fn as_cell(&self) -> Option<&ClosureCell> {
        match self {
            Value::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    /// Returns the exception, if this value is one.
    pub fn as_exception(&self) -> Option<&HostException> {
        match self {
            Value::Exception(exc) => Some(exc),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}
