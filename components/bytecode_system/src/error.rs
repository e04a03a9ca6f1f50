//! Errors raised while assembling an instruction list

use thiserror::Error;

/// Invariant violations detected during emission.
///
/// Each of these indicates a defect in the code driving the list, never a
/// problem with user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    /// Two paths reach a label with different stack depths
    #[error("stack depth mismatch at label {label}: expected {expected}, found {found}")]
    DepthMismatch {
        /// Label index
        label: usize,
        /// Depth recorded first
        expected: usize,
        /// Conflicting depth
        found: usize,
    },

    /// An instruction pops more than the simulated stack holds
    #[error("stack underflow emitting {instruction}: depth {depth}, needs {needed}")]
    StackUnderflow {
        /// Mnemonic
        instruction: &'static str,
        /// Current depth
        depth: usize,
        /// Operands consumed
        needed: usize,
    },

    /// A label was marked twice
    #[error("label {0} marked twice")]
    LabelRemarked(usize),

    /// Branches still point at a label that was never marked
    #[error("label {0} is referenced but never marked")]
    UnboundLabel(usize),

    /// A fault region has no handler end
    #[error("fault region starting at {0} has no handler end")]
    MissingHandlerEnd(usize),

    /// A fixup landed on an instruction that has no branch operand
    #[error("instruction {0} cannot be patched")]
    NotPatchable(usize),
}
