//! Tree-to-bytecode compiler for the light interpreter
//!
//! Walks a [`LambdaTree`](expr_tree::LambdaTree) once and emits a
//! [`CompiledUnit`](bytecode_system::CompiledUnit): the instruction array,
//! its exception handler regions, slot information and the max evaluation
//! stack depth. Nested lambdas become their own units, referenced from
//! `NewClosure` instructions.
//!
//! # Overview
//!
//! - Locals get dense slots on first declaration; parameters come first
//! - Locals captured by a nested lambda are boxed into closure cells and
//!   earlier accesses are rewritten in place
//! - `try` lowers to catch and fault regions; gotos leaving a `finally` are
//!   routed through it with a resume selector
//! - Unsupported shapes fail the whole compile with [`CompileError`]
//!
//! # Examples
//!
//! ```
//! use compiler::{Compiler, CompilerOptions};
//! use core_types::NativeRegistry;
//! use expr_tree::{LambdaTree, Node, Variable};
//!
//! let a = Variable::new("a");
//! let b = Variable::new("b");
//! let tree = LambdaTree::new(
//!     "sum",
//!     vec![],
//!     Node::block(
//!         vec![a.clone(), b.clone()],
//!         vec![
//!             Node::assign(&a, Node::int(1)),
//!             Node::assign(&b, Node::int(2)),
//!             Node::add(Node::var(&a), Node::var(&b)),
//!         ],
//!     ),
//! );
//!
//! let registry = NativeRegistry::new();
//! let unit = Compiler::new(&registry, CompilerOptions::default())
//!     .compile(&tree)
//!     .unwrap();
//! assert_eq!(unit.local_count, 2);
//! assert_eq!(unit.max_stack_depth, 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod closures;
mod codegen;
mod control;
mod error;
mod exceptions;
mod options;
mod scope;

pub use codegen::Compiler;
pub use error::{CompileError, CompileResult};
pub use options::CompilerOptions;
