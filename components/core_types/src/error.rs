//! Exceptions and runtime errors.
//!
//! A [`HostException`] is the catchable thing: it is raised by throw
//! instructions, by native functions and by the interpreter's own operand
//! checks, and it keeps its identity (an `Arc`) as it travels through handler
//! regions and frames. [`RuntimeError`] is what finally escapes an
//! invocation: a thrown exception plus trace context, an abort, or an
//! internal invariant failure.

use crate::abort::AbortReason;
use crate::source::SourceSpan;
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

struct TypeInner {
    name: Arc<str>,
    parent: Option<ExceptionType>,
}

/// A node in the exception type hierarchy.
///
/// Types compare by identity. Typed catch regions match an exception when
/// its type is the filter type or derives from it.
///
/// # Examples
///
/// ```
/// use core_types::ExceptionType;
///
/// let io = ExceptionType::derive("IoError", &ExceptionType::root());
/// assert!(io.is_subtype_of(&ExceptionType::root()));
/// assert!(!ExceptionType::root().is_subtype_of(&io));
/// ```
#[derive(Clone)]
pub struct ExceptionType(Arc<TypeInner>);

fn builtin(slot: &'static OnceLock<ExceptionType>, name: &str) -> ExceptionType {
    slot.get_or_init(|| ExceptionType::derive(name, &ExceptionType::root()))
        .clone()
}

impl ExceptionType {
    /// The root of the hierarchy; a catch filtered on it catches everything.
    pub fn root() -> Self {
        static ROOT: OnceLock<ExceptionType> = OnceLock::new();
        ROOT.get_or_init(|| {
            ExceptionType(Arc::new(TypeInner {
                name: Arc::from("Exception"),
                parent: None,
            }))
        })
        .clone()
    }

    /// Raised on operands of the wrong kind.
    pub fn type_error() -> Self {
        static SLOT: OnceLock<ExceptionType> = OnceLock::new();
        builtin(&SLOT, "TypeError")
    }

    /// Raised on out-of-range array access.
    pub fn index_error() -> Self {
        static SLOT: OnceLock<ExceptionType> = OnceLock::new();
        builtin(&SLOT, "IndexError")
    }

    /// Raised on overflow and division by zero.
    pub fn arithmetic_error() -> Self {
        static SLOT: OnceLock<ExceptionType> = OnceLock::new();
        builtin(&SLOT, "ArithmeticError")
    }

    /// Create a new type deriving from `parent`.
    pub fn derive(name: &str, parent: &ExceptionType) -> Self {
        ExceptionType(Arc::new(TypeInner {
            name: Arc::from(name),
            parent: Some(parent.clone()),
        }))
    }

    /// Name of the type
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Parent type, `None` for the root
    pub fn parent(&self) -> Option<&ExceptionType> {
        self.0.parent.as_ref()
    }

    /// Check whether `self` is `other` or derives from it.
    pub fn is_subtype_of(&self, other: &ExceptionType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.parent();
        }
        false
    }
}

impl PartialEq for ExceptionType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ExceptionType {}

impl fmt::Debug for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExceptionType({})", self.name())
    }
}

impl fmt::Display for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct ExceptionData {
    exception_type: ExceptionType,
    message: String,
    payload: Value,
}

/// A catchable exception.
///
/// Cloning shares the same exception; [`HostException::same_identity`]
/// tells whether two handles are the one originally thrown.
#[derive(Clone)]
pub struct HostException(Arc<ExceptionData>);

impl HostException {
    /// Create an exception of `exception_type` with a message and no payload.
    pub fn new(exception_type: ExceptionType, message: impl Into<String>) -> Self {
        Self::with_payload(exception_type, message, Value::Nil)
    }

    /// Create an exception carrying an arbitrary payload value.
    pub fn with_payload(
        exception_type: ExceptionType,
        message: impl Into<String>,
        payload: Value,
    ) -> Self {
        HostException(Arc::new(ExceptionData {
            exception_type,
            message: message.into(),
            payload,
        }))
    }

    /// Shorthand for a [`ExceptionType::type_error`] exception.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionType::type_error(), message)
    }

    /// Shorthand for a [`ExceptionType::index_error`] exception.
    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionType::index_error(), message)
    }

    /// Shorthand for a [`ExceptionType::arithmetic_error`] exception.
    pub fn arithmetic_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionType::arithmetic_error(), message)
    }

    /// Type of the exception
    pub fn exception_type(&self) -> &ExceptionType {
        &self.0.exception_type
    }

    /// Message given at construction
    pub fn message(&self) -> &str {
        &self.0.message
    }

    /// Payload value (`Nil` when none)
    pub fn payload(&self) -> &Value {
        &self.0.payload
    }

    /// Check whether both handles refer to the same thrown exception.
    pub fn same_identity(&self, other: &HostException) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostException")
            .field("type", &self.exception_type().name())
            .field("message", &self.message())
            .field("payload", self.payload())
            .finish()
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.exception_type(), self.message())
    }
}

impl std::error::Error for HostException {}

/// One frame of diagnostic context attached to an escaping exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Name of the unit the exception passed through
    pub unit: Arc<str>,
    /// Index of the faulting instruction in that unit
    pub instruction: usize,
    /// Innermost source span covering the instruction, if recorded
    pub span: Option<SourceSpan>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} [{}]", self.unit, self.instruction)?;
        if let Some(span) = &self.span {
            write!(f, " ({})", span)?;
        }
        Ok(())
    }
}

/// Error escaping an invocation.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// A host exception nobody caught.
    #[error("{exception}")]
    Thrown {
        /// The exception, with its original identity
        exception: HostException,
        /// Units it unwound through, innermost first
        trace: Vec<TraceEntry>,
    },

    /// An asynchronous abort that ran every pending fault handler.
    #[error("execution aborted: {0}")]
    Aborted(AbortReason),

    /// The interpreter found a state the compiler should never produce.
    #[error("interpreter invariant violated: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// The thrown exception, for [`RuntimeError::Thrown`].
    pub fn exception(&self) -> Option<&HostException> {
        match self {
            RuntimeError::Thrown { exception, .. } => Some(exception),
            _ => None,
        }
    }

    /// Append a trace entry if this is a thrown exception.
    pub fn with_trace(mut self, entry: TraceEntry) -> Self {
        if let RuntimeError::Thrown { trace, .. } = &mut self {
            trace.push(entry);
        }
        self
    }
}

impl From<HostException> for RuntimeError {
    fn from(exception: HostException) -> Self {
        RuntimeError::Thrown {
            exception,
            trace: Vec::new(),
        }
    }
}
