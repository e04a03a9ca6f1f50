//! Lowering of try/catch/finally/fault
//!
//! A try with a finally compiles to:
//!
//! ```text
//!         InitLocal(selector)
//! start:  <body>                      catch regions cover [start, body_end)
//!         Branch finally
//!         <catch handlers>            each ends in LeaveExceptionHandler finally
//!         <resume trampolines>        one per label a jump leaves the try for
//! finally:<finally body>              fault region [start, finally) -> finally
//!         LoadLocal(selector)
//!         Switch                      resume selector -> re-issued goto
//!         Branch end
//!         <re-issued gotos>
//! end:
//! ```
//!
//! Catch and fault handlers are entered with an empty evaluation stack, so
//! a try may only start at depth zero; a try used as a value keeps its
//! result in a hidden local.

use crate::codegen::Session;
use crate::error::{CompileError, CompileResult};
use crate::scope::{GotoScope, GotoScopeKind, PendingGoto};
use bytecode_system::{ExceptionHandler, Instruction, LabelId, SlotId};
use core_types::Value;
use expr_tree::{AssignTarget, CatchBlock, Node};
use tracing::trace;

/// A label some jumps leave a try for, with the gotos that target it
struct Resume {
    label: LabelId,
    carries_value: bool,
    gotos: Vec<usize>,
}

impl Session<'_> {
    pub(crate) fn compile_try(
        &mut self,
        body: &Node,
        handlers: &[CatchBlock],
        finally: Option<&Node>,
        fault: Option<&Node>,
        value: bool,
    ) -> CompileResult<()> {
        if handlers.is_empty() && finally.is_none() && fault.is_none() {
            return self.compile(body, value);
        }
        if self.depth() != 0 {
            return Err(CompileError::Unsupported(
                "try with pending operands on the evaluation stack".into(),
            ));
        }
        if fault.is_some() && (!handlers.is_empty() || finally.is_some()) {
            return Err(CompileError::Unsupported(
                "fault clause combined with catch or finally".into(),
            ));
        }

        let result = if value {
            Some(self.unit().hidden_slot())
        } else {
            None
        };

        match (fault, rethrow_prefix(handlers, finally)) {
            (Some(fault), _) => self.compile_fault_only(body, std::iter::once(fault), result)?,
            (None, Some(prefix)) => self.compile_fault_only(body, prefix, result)?,
            (None, None) => self.compile_try_catch_finally(body, handlers, finally, result)?,
        }

        if let Some(slot) = result {
            self.emit(Instruction::LoadLocal(slot))?;
        }
        Ok(())
    }

    pub(crate) fn compile_rethrow(&mut self, value: bool) -> CompileResult<()> {
        let slot = self
            .unit()
            .catch_slots
            .last()
            .copied()
            .ok_or_else(|| CompileError::Unsupported("rethrow outside of a catch block".into()))?;
        self.load_slot(slot)?;
        self.emit(Instruction::Rethrow { has_result: value })?;
        Ok(())
    }

    fn compile_protected(&mut self, body: &Node, result: Option<SlotId>) -> CompileResult<()> {
        self.compile(body, result.is_some())?;
        if let Some(slot) = result {
            self.emit(Instruction::StoreLocalVoid(slot))?;
        }
        Ok(())
    }

    /// Try/fault, and a catch-all that only observes before re-throwing:
    /// the handler runs on the way out and the exception is never
    /// materialized.
    fn compile_fault_only<'n, I>(&mut self, body: &Node, handler: I, result: Option<SlotId>) -> CompileResult<()>
    where
        I: IntoIterator<Item = &'n Node>,
    {
        let end = self.unit().list.new_label();
        let start = self.position();
        self.compile_protected(body, result)?;
        let body_end = self.position();
        self.unit().list.emit_branch(Instruction::Branch(0), end)?;

        self.unit().list.enter_at(0);
        let target = self.position();
        self.compile_handler_body(handler)?;
        let handler_end = self.position();
        self.unit().list.mark_unreachable();

        let mut region = ExceptionHandler::fault(start, body_end, target);
        region.handler_end = Some(handler_end);
        self.unit().handlers.push(region);

        self.unit().list.mark_label(end)?;
        Ok(())
    }

    fn compile_try_catch_finally(
        &mut self,
        body: &Node,
        handlers: &[CatchBlock],
        finally: Option<&Node>,
        result: Option<SlotId>,
    ) -> CompileResult<()> {
        let leave_to = self.unit().list.new_label();
        let selector = match finally {
            Some(_) => {
                let slot = self.unit().hidden_slot();
                self.emit(Instruction::InitLocal(slot))?;
                Some(slot)
            }
            None => None,
        };

        let start = self.position();
        if finally.is_some() {
            self.unit().goto_scopes.push(GotoScope {
                kind: GotoScopeKind::Try,
                start,
                gotos: Vec::new(),
            });
        }

        self.compile_protected(body, result)?;
        let body_end = self.position();
        self.unit().list.emit_branch(Instruction::Branch(0), leave_to)?;

        for catch in handlers {
            self.compile_catch(catch, start, body_end, leave_to, result)?;
        }

        let (Some(finally), Some(selector)) = (finally, selector) else {
            self.unit().list.mark_label(leave_to)?;
            return Ok(());
        };

        let scope = self
            .unit()
            .goto_scopes
            .pop()
            .ok_or_else(|| CompileError::Internal("goto scope underflow".into()))?;
        let (resumes, value_slot) = self.emit_trampolines(&scope, leave_to, selector)?;

        self.unit().list.mark_label(leave_to)?;
        let finally_start = self.position();
        for resume in &resumes {
            for goto in &resume.gotos {
                self.unit().list.set_goto_route(*goto, finally_start);
            }
        }

        self.compile_handler_body(std::iter::once(finally))?;
        let handler_end = self.position();
        let mut region = ExceptionHandler::fault(start, finally_start, finally_start);
        region.handler_end = Some(handler_end);
        self.unit().handlers.push(region);

        if !resumes.is_empty() && self.unit().list.is_reachable() {
            self.emit_resume_dispatch(&resumes, selector, value_slot)?;
        }
        Ok(())
    }

    fn compile_catch(
        &mut self,
        catch: &CatchBlock,
        start: usize,
        body_end: usize,
        leave_to: LabelId,
        result: Option<SlotId>,
    ) -> CompileResult<()> {
        let needs_exception = catch.variable.is_some() || mentions_rethrow(&catch.body);

        self.unit().list.enter_at(0);
        let target = self
            .emit(Instruction::EnterExceptionHandler {
                pushes_exception: needs_exception,
            })?
            .ok_or_else(|| CompileError::Internal("catch handler is unreachable".into()))?;

        self.unit().push_scope();
        let slot = match &catch.variable {
            Some(variable) => {
                let slot = self.unit().declare(variable);
                self.emit(Instruction::InitLocal(slot))?;
                self.store_slot(slot, false)?;
                Some(slot)
            }
            None if needs_exception => {
                let slot = self.unit().hidden_slot();
                self.emit(Instruction::StoreLocalVoid(slot))?;
                Some(slot)
            }
            None => None,
        };

        if let Some(slot) = slot {
            self.unit().catch_slots.push(slot);
        }
        self.compile(&catch.body, result.is_some())?;
        if let Some(slot) = result {
            self.emit(Instruction::StoreLocalVoid(slot))?;
        }
        if slot.is_some() {
            self.unit().catch_slots.pop();
        }
        self.unit().pop_scope();

        self.unit()
            .list
            .emit_branch(Instruction::LeaveExceptionHandler(0), leave_to)?;
        self.unit().handlers.push(ExceptionHandler::catch(
            start,
            body_end,
            target,
            catch.filter.clone(),
            needs_exception,
        ));
        Ok(())
    }

    /// Compile a finally or fault body. Control may only leave it by
    /// falling through.
    fn compile_handler_body<'n, I>(&mut self, nodes: I) -> CompileResult<()>
    where
        I: IntoIterator<Item = &'n Node>,
    {
        let start = self.position();
        self.unit().goto_scopes.push(GotoScope {
            kind: GotoScopeKind::Handler,
            start,
            gotos: Vec::new(),
        });
        for node in nodes {
            self.compile(node, false)?;
        }
        let scope = self
            .unit()
            .goto_scopes
            .pop()
            .ok_or_else(|| CompileError::Internal("goto scope underflow".into()))?;
        debug_assert_eq!(scope.kind, GotoScopeKind::Handler);
        if !scope.leaving(&self.unit().list).is_empty() {
            return Err(CompileError::Unsupported(
                "jump out of a finally or fault block".into(),
            ));
        }
        Ok(())
    }

    /// Redirect every goto leaving the try into a stub that records which
    /// label to resume at and enters the finally.
    fn emit_trampolines(
        &mut self,
        scope: &GotoScope,
        finally: LabelId,
        selector: SlotId,
    ) -> CompileResult<(Vec<Resume>, Option<SlotId>)> {
        let leaving: Vec<PendingGoto> = scope.leaving(&self.unit().list);
        let mut resumes: Vec<Resume> = Vec::new();
        for goto in leaving {
            match resumes.iter_mut().find(|r| r.label == goto.label) {
                Some(resume) => resume.gotos.push(goto.instruction),
                None => resumes.push(Resume {
                    label: goto.label,
                    carries_value: goto.carries_value,
                    gotos: vec![goto.instruction],
                }),
            }
        }

        let value_slot = if resumes.iter().any(|r| r.carries_value) {
            Some(self.unit().hidden_slot())
        } else {
            None
        };

        for (route, resume) in resumes.iter().enumerate() {
            let unit = self.unit();
            let stub = unit.list.new_label();
            for goto in &resume.gotos {
                unit.list.retarget(*goto, resume.label, stub)?;
            }
            unit.list.enter_at(resume.carries_value as usize);
            unit.list.mark_label(stub)?;
            if let (true, Some(slot)) = (resume.carries_value, value_slot) {
                self.emit(Instruction::StoreLocalVoid(slot))?;
            }
            self.emit(Instruction::Push(Value::Int(route as i64)))?;
            self.emit(Instruction::StoreLocalVoid(selector))?;
            self.unit().list.emit_branch(Instruction::Branch(0), finally)?;
            trace!(
                unit = %self.unit().name(),
                route,
                jumps = resume.gotos.len(),
                "routing jumps through finally"
            );
        }
        Ok((resumes, value_slot))
    }

    fn emit_resume_dispatch(
        &mut self,
        resumes: &[Resume],
        selector: SlotId,
        value_slot: Option<SlotId>,
    ) -> CompileResult<()> {
        let end = self.unit().list.new_label();
        self.emit(Instruction::LoadLocal(selector))?;
        let arms: Vec<LabelId> = resumes.iter().map(|_| self.unit().list.new_label()).collect();
        let table: Vec<(i64, LabelId)> = arms
            .iter()
            .enumerate()
            .map(|(route, arm)| (route as i64, *arm))
            .collect();
        self.unit().list.emit_switch(&table)?;
        self.unit().list.emit_branch(Instruction::Branch(0), end)?;

        for (resume, arm) in resumes.iter().zip(arms) {
            self.unit().list.mark_label(arm)?;
            if resume.carries_value {
                let slot = value_slot
                    .ok_or_else(|| CompileError::Internal("resume value slot missing".into()))?;
                self.emit(Instruction::LoadLocal(slot))?;
            }
            self.emit_goto(resume.label, resume.carries_value, false)?;
        }
        self.unit().list.mark_label(end)?;
        Ok(())
    }
}

/// Statements run before re-throwing, for a lone catch-all that binds no
/// variable and ends by re-throwing.
fn rethrow_prefix<'n>(handlers: &'n [CatchBlock], finally: Option<&Node>) -> Option<&'n [Node]> {
    let [catch] = handlers else {
        return None;
    };
    if finally.is_some() || catch.filter.is_some() || catch.variable.is_some() {
        return None;
    }
    let prefix: &[Node] = match &catch.body {
        Node::Rethrow => &[],
        Node::Block { variables, body } if variables.is_empty() => match body.split_last() {
            Some((Node::Rethrow, rest)) => rest,
            _ => return None,
        },
        _ => return None,
    };
    if prefix.iter().any(mentions_rethrow) {
        return None;
    }
    Some(prefix)
}

/// Whether `node` re-throws outside any nested lambda.
fn mentions_rethrow(node: &Node) -> bool {
    fn any(nodes: &[Node]) -> bool {
        nodes.iter().any(mentions_rethrow)
    }
    fn opt(node: &Option<Box<Node>>) -> bool {
        node.as_deref().is_some_and(mentions_rethrow)
    }
    match node {
        Node::Rethrow => true,
        Node::Constant(_) | Node::Variable(_) | Node::Lambda(_) | Node::CapturedVariables(_) => false,
        Node::Assign { target, value } => {
            mentions_rethrow(value)
                || match target {
                    AssignTarget::Variable(_) => false,
                    AssignTarget::Field { object, .. } => mentions_rethrow(object),
                    AssignTarget::Index { array, index } => {
                        mentions_rethrow(array) || mentions_rethrow(index)
                    }
                }
        }
        Node::Block { body, .. } | Node::NewArray(body) => any(body),
        Node::Conditional {
            test,
            if_true,
            if_false,
        } => mentions_rethrow(test) || mentions_rethrow(if_true) || opt(if_false),
        Node::Loop { body, .. }
        | Node::Throw(body)
        | Node::Unary { operand: body, .. }
        | Node::Field { object: body, .. }
        | Node::DebugInfo { body, .. } => mentions_rethrow(body),
        Node::Label { default, .. } => opt(default),
        Node::Goto { value, .. } => opt(value),
        Node::Switch {
            value,
            cases,
            default,
        } => {
            mentions_rethrow(value)
                || cases.iter().any(|case| mentions_rethrow(&case.body))
                || opt(default)
        }
        Node::Try {
            body,
            handlers,
            finally,
            fault,
        } => {
            mentions_rethrow(body)
                || handlers.iter().any(|h| mentions_rethrow(&h.body))
                || opt(finally)
                || opt(fault)
        }
        Node::Binary { left, right, .. } | Node::Index {
            array: left,
            index: right,
        } => mentions_rethrow(left) || mentions_rethrow(right),
        Node::Call { arguments, .. } => any(arguments),
        Node::Invoke { callee, arguments } => mentions_rethrow(callee) || any(arguments),
        Node::NewObject { fields } => fields.iter().any(|(_, field)| mentions_rethrow(field)),
    }
}
