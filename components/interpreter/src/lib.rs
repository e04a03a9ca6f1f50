//! Stack-machine interpreter for compiled units
//!
//! This crate runs the instruction arrays produced by the compiler:
//! - Per-activation [`StackFrame`]s holding locals and the evaluation stack
//! - A single [`execute`] function dispatching on the instruction enum
//! - Run loops that route exceptions through handler regions, resuming in
//!   catch handlers and running fault handlers innermost first
//! - [`LightClosure`] activations that switch to compiled code once their
//!   unit is promoted
//!
//! # Example
//!
//! ```
//! use compiler::{Compiler, CompilerOptions};
//! use core_types::{Invocable, NativeRegistry, Value};
//! use expr_tree::{LambdaTree, Node, Variable};
//! use interpreter::Activate;
//!
//! let n = Variable::new("n");
//! let tree = LambdaTree::new("double", vec![n.clone()], Node::add(Node::var(&n), Node::var(&n)));
//!
//! let registry = NativeRegistry::new();
//! let unit = Compiler::new(&registry, CompilerOptions::default())
//!     .compile(&tree)
//!     .unwrap();
//!
//! let double = unit.create_activation(Vec::new());
//! assert_eq!(double.call(&[Value::Int(21)]).unwrap(), Value::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod closure;
pub mod dispatch;
pub mod frame;
pub mod operators;
pub mod run;

// Re-export main types at crate root
pub use closure::{Activate, LightClosure};
pub use dispatch::execute;
pub use frame::StackFrame;
pub use run::{run, run_general};
