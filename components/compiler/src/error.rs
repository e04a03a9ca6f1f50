//! Compile errors

use bytecode_system::BytecodeError;
use thiserror::Error;

/// Why a tree could not be compiled.
///
/// A failed compile never yields a partially emitted unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A node kind or shape the compiler does not implement
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// A variable that is neither declared in scope nor in any enclosing
    /// lambda
    #[error("variable '{0}' is not in scope")]
    UnboundVariable(String),

    /// A label target that gotos reference but no label node defines
    #[error("label '{0}' is never defined")]
    UndefinedLabel(String),

    /// The compiler produced inconsistent code
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl From<BytecodeError> for CompileError {
    fn from(err: BytecodeError) -> Self {
        CompileError::Internal(err.to_string())
    }
}

/// Result alias used throughout the compiler
pub type CompileResult<T> = Result<T, CompileError>;
