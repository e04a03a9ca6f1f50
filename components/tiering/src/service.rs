//! The native compilation service consumed by the promoter

use core_types::{ClosureCell, RuntimeError, Value};
use expr_tree::{LambdaTree, Variable};
use std::sync::Arc;

/// A compiled closure body.
///
/// Receives the same closure cells and positional arguments as the
/// interpreted path, in the same order, so an activation can switch
/// strategies between two calls.
pub trait NativeCode: Send + Sync {
    /// Run the compiled body
    fn call(&self, cells: &[ClosureCell], args: &[Value]) -> Result<Value, RuntimeError>;
}

/// Produces [`NativeCode`] from a lambda tree.
pub trait NativeCompiler: Send + Sync {
    /// Compile `tree`; `captured` lists the variables bound to the cells
    /// passed to [`NativeCode::call`], in cell order.
    fn compile_to_native(
        &self,
        tree: &LambdaTree,
        captured: &[Variable],
    ) -> Result<Arc<dyn NativeCode>, String>;
}
