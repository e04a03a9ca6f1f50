//! Bytecode system for the light interpreter
//!
//! This crate provides the stack instruction set, the instruction list the
//! compiler emits into (with stack-depth simulation and label fixups),
//! exception handler regions and the [`CompiledUnit`] container.
//!
//! # Features
//!
//! - Stack-based instructions with declared consumed/produced counts
//! - Forward branch fixups through [`LabelId`]s
//! - Unreachable-code suppression after unconditional transfers
//! - In-place rewriting of local accesses into cell addressing
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Instruction, InstructionList};
//! use core_types::Value;
//!
//! let mut list = InstructionList::new();
//! let skip = list.new_label();
//!
//! list.emit_branch(Instruction::Branch(0), skip).unwrap();
//! list.emit(Instruction::Push(Value::Int(1))).unwrap(); // unreachable, dropped
//! list.mark_label(skip).unwrap();
//! list.emit(Instruction::Push(Value::Int(2))).unwrap();
//!
//! let (instructions, max_depth) = list.finish().unwrap();
//! assert_eq!(instructions.len(), 2);
//! assert_eq!(max_depth, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod handler;
pub mod instruction;
pub mod label;
pub mod list;
pub mod opcode;
pub mod unit;

// Re-export main types at crate root
pub use error::BytecodeError;
pub use handler::{ExceptionHandler, HandlerKind, HandlerTable};
pub use instruction::Instruction;
pub use label::LabelId;
pub use list::InstructionList;
pub use opcode::{CallSite, GotoTarget, SlotId, SwitchTable};
pub use unit::{CompiledUnit, DebugInfo, DispatchMode, UnitParts};
