//! Input trees for the light compiler
//!
//! A host language front end lowers a closure body into a [`LambdaTree`]
//! built from the closed set of [`Node`] kinds defined here. Variables and
//! labels are identified by identity, not by name, so two variables named
//! `x` in nested scopes never collide.
//!
//! # Example
//!
//! ```
//! use expr_tree::{LambdaTree, Node, Variable};
//!
//! let a = Variable::new("a");
//! let b = Variable::new("b");
//!
//! // { a = 1; b = 2; a + b }
//! let body = Node::block(
//!     vec![a.clone(), b.clone()],
//!     vec![
//!         Node::assign(&a, Node::int(1)),
//!         Node::assign(&b, Node::int(2)),
//!         Node::add(Node::var(&a), Node::var(&b)),
//!     ],
//! );
//! let tree = LambdaTree::new("sum", vec![], body);
//! assert_eq!(tree.parameters.len(), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod build;
mod node;
mod symbols;

pub use node::{
    AssignTarget, BinaryOp, CatchBlock, LambdaTree, Node, SwitchCase, UnaryOp,
};
pub use symbols::{LabelTarget, Variable};
