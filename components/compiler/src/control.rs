//! Conditionals, loops, labels, gotos and switches

use crate::codegen::Session;
use crate::error::{CompileError, CompileResult};
use crate::scope::PendingGoto;
use bytecode_system::{Instruction, LabelId};
use expr_tree::{LabelTarget, Node, SwitchCase};

impl Session<'_> {
    pub(crate) fn compile_conditional(
        &mut self,
        test: &Node,
        if_true: &Node,
        if_false: Option<&Node>,
        value: bool,
    ) -> CompileResult<()> {
        self.compile(test, true)?;
        let end = self.unit().list.new_label();

        if if_false.is_none() && !value {
            self.unit().list.emit_branch(Instruction::BranchFalse(0), end)?;
            self.compile(if_true, false)?;
            self.unit().list.mark_label(end)?;
            return Ok(());
        }

        let otherwise = self.unit().list.new_label();
        self.unit().list.emit_branch(Instruction::BranchFalse(0), otherwise)?;
        self.compile(if_true, value)?;
        self.unit().list.emit_branch(Instruction::Branch(0), end)?;
        self.unit().list.mark_label(otherwise)?;
        match if_false {
            Some(node) => self.compile(node, value)?,
            None => self.push_nil(value)?,
        }
        self.unit().list.mark_label(end)?;
        Ok(())
    }

    pub(crate) fn compile_loop(
        &mut self,
        body: &Node,
        break_label: Option<&LabelTarget>,
        continue_label: Option<&LabelTarget>,
        value: bool,
    ) -> CompileResult<()> {
        for target in break_label.iter().chain(continue_label.iter()) {
            if target.carries_value() {
                return Err(CompileError::Unsupported(format!(
                    "loop label '{}' cannot carry a value",
                    target.name()
                )));
            }
        }

        let top = match continue_label {
            Some(target) => self.define_label(target)?,
            None => {
                let top = self.unit().list.new_label();
                self.unit().list.mark_label(top)?;
                top
            }
        };
        self.compile(body, false)?;
        self.unit().list.emit_branch(Instruction::Branch(0), top)?;

        if let Some(target) = break_label {
            self.define_label(target)?;
        }
        self.push_nil(value)
    }

    pub(crate) fn compile_label(
        &mut self,
        target: &LabelTarget,
        default: Option<&Node>,
        value: bool,
    ) -> CompileResult<()> {
        if target.carries_value() {
            match default {
                Some(node) => self.compile(node, true)?,
                None => self.push_nil(true)?,
            }
            self.define_label(target)?;
            return self.discard(value);
        }

        if default.is_some() {
            return Err(CompileError::Unsupported(format!(
                "label '{}' carries no value but has a default",
                target.name()
            )));
        }
        self.define_label(target)?;
        self.push_nil(value)
    }

    pub(crate) fn compile_goto(
        &mut self,
        target: &LabelTarget,
        carried: Option<&Node>,
        value: bool,
    ) -> CompileResult<()> {
        if target.carries_value() != carried.is_some() {
            return Err(CompileError::Unsupported(format!(
                "goto '{}' {} a value the label {}",
                target.name(),
                if carried.is_some() { "passes" } else { "omits" },
                if target.carries_value() { "expects" } else { "does not take" }
            )));
        }
        if let Some(node) = carried {
            self.compile(node, true)?;
        }
        let label = self.unit().label_for(target);
        self.emit_goto(label, target.carries_value(), value)
    }

    /// Emit a goto and register it with the innermost try or handler body.
    pub(crate) fn emit_goto(&mut self, label: LabelId, carries_value: bool, has_result: bool) -> CompileResult<()> {
        let unit = self.unit();
        if let Some(instruction) = unit.list.emit_goto(label, carries_value, has_result)? {
            unit.note_goto(PendingGoto {
                instruction,
                label,
                carries_value,
            });
        }
        Ok(())
    }

    /// Mark the label backing `target` at the current position.
    fn define_label(&mut self, target: &LabelTarget) -> CompileResult<LabelId> {
        let unit = self.unit();
        let label = unit.label_for(target);
        if unit.list.label_index(label).is_some() {
            return Err(CompileError::Unsupported(format!(
                "label '{}' is defined more than once",
                target.name()
            )));
        }
        unit.list.mark_label(label)?;
        Ok(label)
    }

    /// Layout: selector, `Switch`, default arm, then the case arms. An
    /// unmatched selector continues right after the `Switch`.
    pub(crate) fn compile_switch(
        &mut self,
        selector: &Node,
        cases: &[SwitchCase],
        default: Option<&Node>,
        value: bool,
    ) -> CompileResult<()> {
        self.compile(selector, true)?;
        let end = self.unit().list.new_label();
        let arms: Vec<LabelId> = cases.iter().map(|_| self.unit().list.new_label()).collect();
        let table: Vec<(i64, LabelId)> = cases
            .iter()
            .zip(&arms)
            .flat_map(|(case, arm)| case.values.iter().map(move |key| (*key, *arm)))
            .collect();
        self.unit().list.emit_switch(&table)?;

        match default {
            Some(node) => self.compile(node, value)?,
            None => self.push_nil(value)?,
        }
        self.unit().list.emit_branch(Instruction::Branch(0), end)?;

        for (i, (case, arm)) in cases.iter().zip(&arms).enumerate() {
            self.unit().list.mark_label(*arm)?;
            self.compile(&case.body, value)?;
            if i + 1 < cases.len() {
                self.unit().list.emit_branch(Instruction::Branch(0), end)?;
            }
        }
        self.unit().list.mark_label(end)?;
        Ok(())
    }
}
