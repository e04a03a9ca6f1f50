//! Nested lambdas and captured variables
//!
//! A variable referenced from a nested lambda lives in a closure cell. If
//! the variable is a local of the unit that declares it, that local is
//! boxed on the spot and every access already emitted is rewritten. Units
//! in between get the variable appended to their own cell list, so the
//! cell is threaded through each enclosing closure.

use crate::codegen::Session;
use crate::error::{CompileError, CompileResult};
use bytecode_system::Instruction;
use expr_tree::{LambdaTree, Variable};
use std::sync::Arc;

impl Session<'_> {
    /// Make `variable` reachable from unit `unit`: boxed if it is one of
    /// its locals, otherwise one of its closure cells.
    fn ensure_available(&mut self, unit: usize, variable: &Variable) -> CompileResult<()> {
        let builder = &mut self.units[unit];
        if let Some(slot) = builder.lookup_local(variable) {
            builder.box_local(slot);
            return Ok(());
        }
        if builder.closure_index(variable).is_some() {
            return Ok(());
        }
        if unit == 0 {
            return Err(CompileError::UnboundVariable(variable.name().to_string()));
        }
        self.ensure_available(unit - 1, variable)?;
        self.units[unit].add_closure(variable);
        Ok(())
    }

    /// Cell index of a variable the innermost unit does not declare
    pub(crate) fn closure_slot(&mut self, variable: &Variable) -> CompileResult<u32> {
        let innermost = self.units.len() - 1;
        self.ensure_available(innermost, variable)?;
        self.units[innermost]
            .closure_index(variable)
            .ok_or_else(|| CompileError::Internal(format!("no cell for '{}'", variable.name())))
    }

    /// Push the cell backing `variable`
    fn load_cell(&mut self, variable: &Variable) -> CompileResult<()> {
        let instruction = match self.unit().lookup_local(variable) {
            Some(slot) => {
                self.unit().box_local(slot);
                Instruction::LoadLocalCell(slot)
            }
            None => Instruction::LoadClosureCell(self.closure_slot(variable)?),
        };
        self.emit(instruction)?;
        Ok(())
    }

    pub(crate) fn compile_lambda(&mut self, tree: &Arc<LambdaTree>, value: bool) -> CompileResult<()> {
        let unit = self.compile_unit(tree.clone())?;
        for variable in unit.captured.iter() {
            self.load_cell(variable)?;
        }
        let captures = unit.captured.len() as u32;
        self.emit(Instruction::NewClosure { unit, captures })?;
        self.discard(value)
    }

    pub(crate) fn compile_captured_variables(
        &mut self,
        variables: &[Variable],
        value: bool,
    ) -> CompileResult<()> {
        for variable in variables {
            self.load_cell(variable)?;
        }
        self.emit(Instruction::CollectCells(variables.len() as u32))?;
        self.discard(value)
    }
}
