//! Core value types, exceptions and host seams for the light interpreter.
//!
//! This crate provides the foundational types shared by the compiler, the
//! interpreter and the promotion controller.
//!
//! # Overview
//!
//! - [`Value`] - Dynamic values flowing through frames and closure cells
//! - [`ClosureCell`] - Shared mutable box for a captured variable
//! - [`HostException`] / [`ExceptionType`] - Catchable exceptions and their type hierarchy
//! - [`RuntimeError`] - What escapes an invocation
//! - [`AbortSignal`] - Externally injected asynchronous abort
//! - [`Invocable`] - Anything callable with positional arguments
//! - [`NativeRegistry`] - Externally defined functions keyed by [`NativeHandle`]
//!
//! # Examples
//!
//! ```
//! use core_types::{ClosureCell, Value};
//!
//! let cell = ClosureCell::new(Value::Int(1));
//! let shared = cell.clone();
//! shared.set(Value::Int(2));
//!
//! assert_eq!(cell.get(), Value::Int(2));
//! assert!(Value::Boolean(true).is_truthy());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod abort;
mod cell;
mod error;
mod native;
mod source;
mod value;

pub use abort::{AbortGuard, AbortReason, AbortSignal};
pub use cell::ClosureCell;
pub use error::{ExceptionType, HostException, RuntimeError, TraceEntry};
pub use native::{Invocable, NativeEntry, NativeFunction, NativeHandle, NativeRegistry};
pub use source::{SourcePosition, SourceSpan};
pub use value::{ArrayRef, ObjectRef, Value, ValueKind};
