//! Stack frame for one activation

use bytecode_system::{CompiledUnit, SlotId};
use core_types::{ClosureCell, RuntimeError, Value};
use std::sync::Arc;

/// Runtime state of one activation
///
/// Locals and the evaluation stack share one flat array sized
/// `local_count + max_stack_depth`; the stack grows upward from the locals
/// boundary. Closure cells captured from enclosing activations are shared,
/// never copied.
#[derive(Debug)]
pub struct StackFrame {
    values: Vec<Value>,
    locals: usize,
    top: usize,
    cells: Arc<[ClosureCell]>,
    /// Index of the instruction that raised the last exception
    pub fault_index: usize,
}

impl StackFrame {
    /// Create a frame for `unit`, binding `args` to its parameters
    ///
    /// Boxed locals start out as fresh cells; a boxed parameter's cell holds
    /// its argument.
    pub fn new(unit: &CompiledUnit, cells: Arc<[ClosureCell]>, args: &[Value]) -> Self {
        let mut values = vec![Value::Nil; unit.frame_size()];
        for (slot, arg) in values.iter_mut().zip(args).take(unit.parameter_count) {
            *slot = arg.clone();
        }
        for boxed in &unit.boxed_slots {
            if let Some(slot) = values.get_mut(boxed.index()) {
                let initial = std::mem::take(slot);
                *slot = Value::Cell(ClosureCell::new(initial));
            }
        }
        Self {
            values,
            locals: unit.local_count,
            top: unit.local_count,
            cells,
            fault_index: 0,
        }
    }

    /// Number of values on the evaluation stack
    pub fn depth(&self) -> usize {
        self.top - self.locals
    }

    /// Push a value on the evaluation stack
    ///
    /// Pushing past the unit's max stack depth means the compiler's depth
    /// tracking was wrong and is reported as an internal error.
    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        let slot = self.values.get_mut(self.top).ok_or_else(|| {
            RuntimeError::Internal(format!(
                "evaluation stack overflow at depth {}",
                self.top - self.locals
            ))
        })?;
        *slot = value;
        self.top += 1;
        Ok(())
    }

    /// Pop the top of stack
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.top <= self.locals {
            return Err(underflow());
        }
        self.top -= 1;
        Ok(std::mem::take(&mut self.values[self.top]))
    }

    /// Top of stack without popping it
    pub fn peek(&self) -> Result<Value, RuntimeError> {
        if self.top <= self.locals {
            return Err(underflow());
        }
        Ok(self.values[self.top - 1].clone())
    }

    /// Pop `count` values, returned in push order
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        if self.depth() < count {
            return Err(underflow());
        }
        let popped = self.values[self.top - count..self.top]
            .iter_mut()
            .map(std::mem::take)
            .collect();
        self.top -= count;
        Ok(popped)
    }

    /// Cut the evaluation stack back to `depth` values
    pub fn reset_stack(&mut self, depth: usize) {
        let target = self.locals + depth;
        while self.top > target {
            self.top -= 1;
            self.values[self.top] = Value::Nil;
        }
    }

    /// Read a plain local
    pub fn local(&self, slot: SlotId) -> Value {
        self.values.get(slot.index()).cloned().unwrap_or(Value::Nil)
    }

    /// Overwrite a plain local
    pub fn set_local(&mut self, slot: SlotId, value: Value) {
        if let Some(target) = self.values.get_mut(slot.index()) {
            *target = value;
        }
    }

    /// The cell stored in a boxed local
    pub fn local_cell(&self, slot: SlotId) -> Result<ClosureCell, RuntimeError> {
        match self.values.get(slot.index()) {
            Some(Value::Cell(cell)) => Ok(cell.clone()),
            other => Err(RuntimeError::Internal(format!(
                "slot {} holds {:?} instead of a cell",
                slot.0, other
            ))),
        }
    }

    /// One of the cells captured from enclosing activations
    pub fn closure_cell(&self, index: u32) -> Result<&ClosureCell, RuntimeError> {
        self.cells.get(index as usize).ok_or_else(|| {
            RuntimeError::Internal(format!(
                "closure cell {} out of {}",
                index,
                self.cells.len()
            ))
        })
    }
}

fn underflow() -> RuntimeError {
    RuntimeError::Internal("pop from an empty evaluation stack".into())
}
