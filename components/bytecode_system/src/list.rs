//! Instruction list with stack-depth simulation and label fixups
//!
//! The list tracks the evaluation stack depth the emitted code would have
//! at run time. The depth is structural: it keeps being updated while the
//! list is unreachable (after an unconditional transfer), but nothing is
//! appended until a label is marked again. Marking a label restores the
//! depth recorded for it.

use crate::error::BytecodeError;
use crate::instruction::Instruction;
use crate::label::{Fixup, Label, LabelId};
use crate::opcode::{GotoTarget, SlotId, SwitchTable};
use std::collections::HashSet;
use std::sync::Arc;

/// Growable instruction arena used by the compiler.
///
/// # Example
///
/// ```
/// use bytecode_system::{Instruction, InstructionList};
/// use core_types::Value;
///
/// let mut list = InstructionList::new();
/// let end = list.new_label();
///
/// list.emit(Instruction::Push(Value::Boolean(true))).unwrap();
/// list.emit_branch(Instruction::BranchFalse(0), end).unwrap();
/// list.emit(Instruction::Push(Value::Int(1))).unwrap();
/// list.emit(Instruction::Pop).unwrap();
/// list.mark_label(end).unwrap();
///
/// let (instructions, max_depth) = list.finish().unwrap();
/// assert_eq!(instructions.len(), 4);
/// assert_eq!(max_depth, 1);
/// assert!(matches!(instructions[1], Instruction::BranchFalse(3)));
/// ```
#[derive(Debug, Clone)]
pub struct InstructionList {
    instructions: Vec<Instruction>,
    labels: Vec<Label>,
    depth: usize,
    max_depth: usize,
    reachable: bool,
}

impl Default for InstructionList {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionList {
    /// Create an empty, reachable list at depth zero
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            labels: Vec::new(),
            depth: 0,
            max_depth: 0,
            reachable: true,
        }
    }

    /// Number of emitted instructions; also the index of the next one
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Current simulated depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// High-water mark of the simulated depth
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether emitted instructions are currently appended
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Emitted instructions
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Mutable access to one emitted instruction
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instructions.get_mut(index)
    }

    /// Append an instruction and apply its stack effect.
    ///
    /// Returns the index of the instruction, or `None` when the list is
    /// unreachable and nothing was appended.
    pub fn emit(&mut self, instruction: Instruction) -> Result<Option<usize>, BytecodeError> {
        let consumed = instruction.consumed();
        if consumed > self.depth {
            return Err(BytecodeError::StackUnderflow {
                instruction: instruction.name(),
                depth: self.depth,
                needed: consumed,
            });
        }
        self.depth = self.depth - consumed + instruction.produced();
        let transfers = instruction.is_unconditional_transfer();

        let index = if self.reachable {
            self.max_depth = self.max_depth.max(self.depth);
            self.instructions.push(instruction);
            Some(self.instructions.len() - 1)
        } else {
            None
        };
        if transfers {
            self.reachable = false;
        }
        Ok(index)
    }

    /// Allocate an unmarked label
    pub fn new_label(&mut self) -> LabelId {
        self.labels.push(Label::default());
        LabelId(self.labels.len() - 1)
    }

    /// Index of a marked label
    pub fn label_index(&self, label: LabelId) -> Option<usize> {
        self.labels[label.0].index
    }

    /// Depth recorded for a label
    pub fn label_depth(&self, label: LabelId) -> Option<usize> {
        self.labels[label.0].depth
    }

    /// Fix a label at the next instruction index and patch every pending
    /// branch to it.
    pub fn mark_label(&mut self, id: LabelId) -> Result<(), BytecodeError> {
        let index = self.instructions.len();
        let reachable = self.reachable;
        let current = self.depth;
        let label = &mut self.labels[id.0];
        if label.is_marked() {
            return Err(BytecodeError::LabelRemarked(id.0));
        }

        let depth = match label.depth {
            Some(expected) if reachable && expected != current => {
                return Err(BytecodeError::DepthMismatch {
                    label: id.0,
                    expected,
                    found: current,
                });
            }
            Some(expected) => expected,
            None => {
                label.depth = Some(current);
                current
            }
        };
        label.index = Some(index);
        let pending = std::mem::take(&mut label.pending);

        self.depth = depth;
        self.max_depth = self.max_depth.max(depth);
        self.reachable = true;

        for fixup in pending {
            self.patch(fixup, index, depth)?;
        }
        Ok(())
    }

    /// Emit a branch that keeps the evaluation stack as is.
    ///
    /// The label records the depth after the branch's own operands are
    /// popped; all branches and the fall-through path must agree on it.
    pub fn emit_branch(&mut self, branch: Instruction, label: LabelId) -> Result<(), BytecodeError> {
        if let Some(index) = self.emit(branch)? {
            self.note_depth(label, self.depth)?;
            self.bind(index, None, label)?;
        }
        Ok(())
    }

    /// Emit a non-local jump. Its target depth is taken from the label when
    /// the label is marked, so the jump site may be deeper than the label.
    pub fn emit_goto(
        &mut self,
        label: LabelId,
        carries_value: bool,
        has_result: bool,
    ) -> Result<Option<usize>, BytecodeError> {
        let goto = Instruction::Goto(GotoTarget::new(carries_value, has_result));
        let index = self.emit(goto)?;
        if let Some(index) = index {
            self.bind(index, None, label)?;
        }
        Ok(index)
    }

    /// Emit a switch over `cases`. A key listed twice keeps its first label.
    pub fn emit_switch(&mut self, cases: &[(i64, LabelId)]) -> Result<Option<usize>, BytecodeError> {
        let index = self.emit(Instruction::Switch(Arc::new(SwitchTable::new())))?;
        if let Some(index) = index {
            let mut seen = HashSet::new();
            for &(key, label) in cases {
                if seen.insert(key) {
                    self.note_depth(label, self.depth)?;
                    self.bind(index, Some(key), label)?;
                }
            }
        }
        Ok(index)
    }

    /// Move an emitted branch from one label to another.
    pub fn retarget(&mut self, instruction: usize, from: LabelId, to: LabelId) -> Result<(), BytecodeError> {
        self.labels[from.0]
            .pending
            .retain(|fixup| fixup.instruction != instruction);
        self.bind(instruction, None, to)
    }

    /// Stop appending until the next label
    pub fn mark_unreachable(&mut self) {
        self.reachable = false;
    }

    /// Resume emission at `depth` for code entered from outside the normal
    /// flow, such as a catch handler.
    pub fn enter_at(&mut self, depth: usize) {
        self.depth = depth;
        self.max_depth = self.max_depth.max(depth);
        self.reachable = true;
    }

    /// Rewrite every plain access to `slot` into its cell-addressing form.
    /// Returns how many instructions changed.
    pub fn box_slot(&mut self, slot: SlotId) -> usize {
        let mut rewritten = 0;
        for instruction in &mut self.instructions {
            if let Some(boxed) = instruction.boxed_form(slot) {
                *instruction = boxed;
                rewritten += 1;
            }
        }
        rewritten
    }

    /// Record which finally block a rewritten goto is routed through
    pub fn set_goto_route(&mut self, instruction: usize, finally_start: usize) {
        if let Some(Instruction::Goto(target)) = self.instructions.get_mut(instruction) {
            target.via_finally = Some(finally_start);
        }
    }

    /// Check that every referenced label was marked and hand out the
    /// instructions together with the max depth.
    pub fn finish(self) -> Result<(Vec<Instruction>, usize), BytecodeError> {
        if let Some(unbound) = self.labels.iter().position(|l| !l.pending.is_empty()) {
            return Err(BytecodeError::UnboundLabel(unbound));
        }
        Ok((self.instructions, self.max_depth))
    }

    fn note_depth(&mut self, id: LabelId, depth: usize) -> Result<(), BytecodeError> {
        let label = &mut self.labels[id.0];
        match label.depth {
            Some(expected) if expected != depth => Err(BytecodeError::DepthMismatch {
                label: id.0,
                expected,
                found: depth,
            }),
            Some(_) => Ok(()),
            None => {
                label.depth = Some(depth);
                Ok(())
            }
        }
    }

    fn bind(&mut self, instruction: usize, case: Option<i64>, id: LabelId) -> Result<(), BytecodeError> {
        let label = &mut self.labels[id.0];
        match (label.index, label.depth) {
            (Some(index), Some(depth)) => self.patch(Fixup { instruction, case }, index, depth),
            _ => {
                label.pending.push(Fixup { instruction, case });
                Ok(())
            }
        }
    }

    fn patch(&mut self, fixup: Fixup, target: usize, depth: usize) -> Result<(), BytecodeError> {
        let offset = target as i64 - fixup.instruction as i64;
        let patched = self
            .instructions
            .get_mut(fixup.instruction)
            .map(|i| i.fixup(fixup.case, offset as i32, depth))
            .unwrap_or(false);
        if patched {
            Ok(())
        } else {
            Err(BytecodeError::NotPatchable(fixup.instruction))
        }
    }
}
