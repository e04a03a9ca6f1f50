//! Per-unit compilation state: slots, scopes, labels and pending jumps

use bytecode_system::{DebugInfo, ExceptionHandler, InstructionList, LabelId, SlotId};
use expr_tree::{LambdaTree, LabelTarget, Variable};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::trace;

/// A goto emitted inside a try or handler body, checked when that body
/// closes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingGoto {
    pub instruction: usize,
    pub label: LabelId,
    pub carries_value: bool,
}

/// What closing a goto scope does with the jumps that leave it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GotoScopeKind {
    /// Protected body of a try with finally: leaving jumps are routed
    /// through the finally
    Try,
    /// Finally or fault body: leaving jumps are rejected
    Handler,
}

#[derive(Debug)]
pub(crate) struct GotoScope {
    pub kind: GotoScopeKind,
    pub start: usize,
    pub gotos: Vec<PendingGoto>,
}

impl GotoScope {
    /// Jumps whose label is unmarked or marked before the scope began
    pub fn leaving(&self, list: &InstructionList) -> Vec<PendingGoto> {
        self.gotos
            .iter()
            .filter(|g| match list.label_index(g.label) {
                Some(index) => index < self.start,
                None => true,
            })
            .copied()
            .collect()
    }
}

/// Everything tracked while one lambda is being compiled.
pub(crate) struct UnitBuilder {
    pub tree: Arc<LambdaTree>,
    pub list: InstructionList,
    pub handlers: Vec<ExceptionHandler>,
    pub debug_info: Vec<DebugInfo>,
    pub goto_scopes: Vec<GotoScope>,
    /// Slots holding the exception of each enclosing catch, innermost last
    pub catch_slots: Vec<SlotId>,
    scopes: Vec<HashMap<Variable, SlotId>>,
    local_count: u32,
    boxed: BTreeSet<SlotId>,
    closure: Vec<Variable>,
    labels: HashMap<LabelTarget, LabelId>,
}

impl UnitBuilder {
    /// Start a unit; parameters take the first slots
    pub fn new(tree: Arc<LambdaTree>) -> Self {
        let mut builder = Self {
            tree,
            list: InstructionList::new(),
            handlers: Vec::new(),
            debug_info: Vec::new(),
            goto_scopes: Vec::new(),
            catch_slots: Vec::new(),
            scopes: vec![HashMap::new()],
            local_count: 0,
            boxed: BTreeSet::new(),
            closure: Vec::new(),
            labels: HashMap::new(),
        };
        let parameters = builder.tree.parameters.clone();
        for parameter in &parameters {
            builder.declare(parameter);
        }
        builder
    }

    pub fn name(&self) -> &Arc<str> {
        &self.tree.name
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Give `variable` a fresh slot in the innermost scope
    pub fn declare(&mut self, variable: &Variable) -> SlotId {
        let slot = self.hidden_slot();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(variable.clone(), slot);
        }
        slot
    }

    /// A slot no variable names, for compiler temporaries
    pub fn hidden_slot(&mut self) -> SlotId {
        let slot = SlotId(self.local_count);
        self.local_count += 1;
        slot
    }

    pub fn local_count(&self) -> usize {
        self.local_count as usize
    }

    pub fn parameter_count(&self) -> usize {
        self.tree.parameters.len()
    }

    pub fn lookup_local(&self, variable: &Variable) -> Option<SlotId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(variable).copied())
    }

    pub fn is_boxed(&self, slot: SlotId) -> bool {
        self.boxed.contains(&slot)
    }

    /// Turn a local into a closure cell, rewriting every access emitted so
    /// far.
    pub fn box_local(&mut self, slot: SlotId) {
        if self.boxed.insert(slot) {
            let rewritten = self.list.box_slot(slot);
            trace!(unit = %self.tree.name, slot = slot.0, rewritten, "boxed captured local");
        }
    }

    pub fn boxed_slots(&self) -> &BTreeSet<SlotId> {
        &self.boxed
    }

    pub fn closure_index(&self, variable: &Variable) -> Option<u32> {
        self.closure
            .iter()
            .position(|v| v == variable)
            .map(|i| i as u32)
    }

    pub fn add_closure(&mut self, variable: &Variable) -> u32 {
        self.closure.push(variable.clone());
        (self.closure.len() - 1) as u32
    }

    /// Variables bound to this unit's closure cells, in cell order
    pub fn captured(&self) -> &[Variable] {
        &self.closure
    }

    /// Instruction-list label backing `target`, allocated on first use
    pub fn label_for(&mut self, target: &LabelTarget) -> LabelId {
        if let Some(id) = self.labels.get(target) {
            return *id;
        }
        let id = self.list.new_label();
        self.labels.insert(target.clone(), id);
        id
    }

    /// A target some jump references that no label node positioned
    pub fn undefined_label(&self) -> Option<&LabelTarget> {
        self.labels
            .iter()
            .find(|(_, id)| self.list.label_index(**id).is_none())
            .map(|(target, _)| target)
    }

    /// Record a goto with the innermost goto scope
    pub fn note_goto(&mut self, goto: PendingGoto) {
        if let Some(scope) = self.goto_scopes.last_mut() {
            scope.gotos.push(goto);
        }
    }
}
