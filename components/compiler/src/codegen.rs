//! Tree walk producing compiled units
//!
//! Every node is compiled either for its value (leaving exactly one value
//! on the evaluation stack) or for effect (leaving nothing). Control flow,
//! exception regions and closures live in sibling modules as further
//! `impl Session` blocks.

use crate::error::{CompileError, CompileResult};
use crate::options::CompilerOptions;
use crate::scope::UnitBuilder;
use bytecode_system::{
    CallSite, CompiledUnit, DebugInfo, HandlerTable, Instruction, SlotId, UnitParts,
};
use core_types::{NativeHandle, NativeRegistry, ValueKind};
use expr_tree::{AssignTarget, BinaryOp, LambdaTree, Node, UnaryOp, Variable};
use std::sync::Arc;
use tiering::PromotionState;
use tracing::debug;

/// Compiles lambda trees into [`CompiledUnit`]s.
///
/// The registry of native functions is borrowed for the compiler's
/// lifetime; calls are resolved against it at compile time.
pub struct Compiler<'r> {
    registry: &'r NativeRegistry,
    options: CompilerOptions,
}

impl<'r> Compiler<'r> {
    /// Create a compiler over `registry`
    pub fn new(registry: &'r NativeRegistry, options: CompilerOptions) -> Self {
        Self { registry, options }
    }

    /// Options applied to every unit
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a lambda tree.
    pub fn compile(&self, tree: &LambdaTree) -> CompileResult<Arc<CompiledUnit>> {
        self.compile_shared(Arc::new(tree.clone()))
    }

    /// Compile a lambda tree that is already shared.
    pub fn compile_shared(&self, tree: Arc<LambdaTree>) -> CompileResult<Arc<CompiledUnit>> {
        let mut session = Session {
            registry: self.registry,
            options: &self.options,
            units: Vec::new(),
        };
        session.compile_unit(tree)
    }
}

/// State of one `compile` call: the stack of units being built, outermost
/// first.
pub(crate) struct Session<'a> {
    registry: &'a NativeRegistry,
    options: &'a CompilerOptions,
    pub(crate) units: Vec<UnitBuilder>,
}

impl Session<'_> {
    /// Builder of the innermost unit
    pub(crate) fn unit(&mut self) -> &mut UnitBuilder {
        let innermost = self.units.len() - 1;
        &mut self.units[innermost]
    }

    pub(crate) fn emit(&mut self, instruction: Instruction) -> CompileResult<Option<usize>> {
        Ok(self.unit().list.emit(instruction)?)
    }

    pub(crate) fn depth(&mut self) -> usize {
        self.unit().list.depth()
    }

    pub(crate) fn position(&mut self) -> usize {
        self.unit().list.len()
    }

    /// Drop the value just produced when compiling for effect
    pub(crate) fn discard(&mut self, value: bool) -> CompileResult<()> {
        if !value {
            self.emit(Instruction::Pop)?;
        }
        Ok(())
    }

    /// Push nil when compiling for value
    pub(crate) fn push_nil(&mut self, value: bool) -> CompileResult<()> {
        if value {
            self.emit(Instruction::Push(core_types::Value::Nil))?;
        }
        Ok(())
    }

    /// Compile a lambda body into its own unit.
    pub(crate) fn compile_unit(&mut self, tree: Arc<LambdaTree>) -> CompileResult<Arc<CompiledUnit>> {
        self.units.push(UnitBuilder::new(tree.clone()));
        let body = self.compile(&tree.body, true);
        let builder = self
            .units
            .pop()
            .ok_or_else(|| CompileError::Internal("unit stack underflow".into()))?;
        body?;
        self.finish(builder)
    }

    fn finish(&self, builder: UnitBuilder) -> CompileResult<Arc<CompiledUnit>> {
        if let Some(target) = builder.undefined_label() {
            return Err(CompileError::UndefinedLabel(target.name().to_string()));
        }
        if builder.list.is_reachable() && builder.list.depth() != 1 {
            return Err(CompileError::Internal(format!(
                "body of '{}' leaves {} values",
                builder.name(),
                builder.list.depth()
            )));
        }

        let name = builder.name().clone();
        let local_count = builder.local_count();
        let parameter_count = builder.parameter_count();
        let boxed_slots = builder.boxed_slots().clone();
        let captured = builder.captured().to_vec();
        let handler_count = builder.handlers.len();
        let (instructions, max_stack_depth) = builder.list.finish()?;

        let unit = CompiledUnit::new(UnitParts {
            name: name.clone(),
            instructions,
            handlers: HandlerTable::new(builder.handlers),
            max_stack_depth,
            local_count,
            parameter_count,
            boxed_slots,
            debug_info: builder.debug_info,
            lambda: builder.tree,
            captured,
            promotion: Arc::new(PromotionState::new(
                self.options.tiering.compilation_threshold,
            )),
            promoter: self.options.promoter.clone(),
        })?;

        debug!(
            unit = %name,
            instructions = unit.instructions.len(),
            max_stack_depth,
            locals = local_count,
            handlers = handler_count,
            captured = unit.captured.len(),
            "compiled unit"
        );
        Ok(Arc::new(unit))
    }

    /// Compile `node`, leaving its value on the stack when `value` is set.
    pub(crate) fn compile(&mut self, node: &Node, value: bool) -> CompileResult<()> {
        match node {
            Node::Constant(constant) => {
                if value {
                    self.emit(Instruction::Push(constant.clone()))?;
                }
                Ok(())
            }
            Node::Variable(variable) => {
                if value {
                    self.load_variable(variable)?;
                }
                Ok(())
            }
            Node::Assign { target, value: rhs } => self.compile_assign(target, rhs, value),
            Node::Block { variables, body } => self.compile_block(variables, body, value),
            Node::Conditional {
                test,
                if_true,
                if_false,
            } => self.compile_conditional(test, if_true, if_false.as_deref(), value),
            Node::Loop {
                body,
                break_label,
                continue_label,
            } => self.compile_loop(body, break_label.as_ref(), continue_label.as_ref(), value),
            Node::Label { target, default } => {
                self.compile_label(target, default.as_deref(), value)
            }
            Node::Goto { target, value: carried } => {
                self.compile_goto(target, carried.as_deref(), value)
            }
            Node::Switch {
                value: selector,
                cases,
                default,
            } => self.compile_switch(selector, cases, default.as_deref(), value),
            Node::Try {
                body,
                handlers,
                finally,
                fault,
            } => self.compile_try(body, handlers, finally.as_deref(), fault.as_deref(), value),
            Node::Throw(thrown) => {
                self.compile(thrown, true)?;
                self.emit(Instruction::Throw { has_result: value })?;
                Ok(())
            }
            Node::Rethrow => self.compile_rethrow(value),
            Node::Unary { op, operand } => {
                self.compile(operand, true)?;
                self.emit(match op {
                    UnaryOp::Not => Instruction::Not,
                    UnaryOp::Negate => Instruction::Negate,
                })?;
                self.discard(value)
            }
            Node::Binary {
                op,
                left,
                right,
                operand_kind,
            } => self.compile_binary(*op, left, right, *operand_kind, value),
            Node::Call {
                function,
                arguments,
            } => self.compile_native_call(*function, arguments, value),
            Node::Invoke { callee, arguments } => {
                self.compile(callee, true)?;
                for argument in arguments {
                    self.compile(argument, true)?;
                }
                self.emit(Instruction::Invoke(arguments.len() as u32))?;
                self.discard(value)
            }
            Node::NewObject { fields } => {
                for (_, field) in fields {
                    self.compile(field, true)?;
                }
                let names: Arc<[Arc<str>]> = fields.iter().map(|(name, _)| name.clone()).collect();
                self.emit(Instruction::NewObject(names))?;
                self.discard(value)
            }
            Node::NewArray(items) => {
                for item in items {
                    self.compile(item, true)?;
                }
                self.emit(Instruction::NewArray(items.len() as u32))?;
                self.discard(value)
            }
            Node::Field { object, name } => {
                self.compile(object, true)?;
                self.emit(Instruction::GetField(name.clone()))?;
                self.discard(value)
            }
            Node::Index { array, index } => {
                self.compile(array, true)?;
                self.compile(index, true)?;
                self.emit(Instruction::GetIndex)?;
                self.discard(value)
            }
            Node::Lambda(tree) => self.compile_lambda(tree, value),
            Node::CapturedVariables(variables) => self.compile_captured_variables(variables, value),
            Node::DebugInfo { span, body } => {
                let start = self.position();
                self.compile(body, value)?;
                let end = self.position();
                if self.options.emit_debug_info && end > start {
                    self.unit().debug_info.push(DebugInfo {
                        start,
                        end,
                        span: *span,
                    });
                }
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, variables: &[Variable], body: &[Node], value: bool) -> CompileResult<()> {
        self.unit().push_scope();
        for variable in variables {
            let slot = self.unit().declare(variable);
            self.emit(Instruction::InitLocal(slot))?;
        }
        match body.split_last() {
            Some((last, rest)) => {
                for node in rest {
                    self.compile(node, false)?;
                }
                self.compile(last, value)?;
            }
            None => self.push_nil(value)?,
        }
        self.unit().pop_scope();
        Ok(())
    }

    fn compile_assign(&mut self, target: &AssignTarget, rhs: &Node, value: bool) -> CompileResult<()> {
        match target {
            AssignTarget::Variable(variable) => {
                self.compile(rhs, true)?;
                self.store_variable(variable, value)
            }
            AssignTarget::Field { object, name } => {
                self.compile(object, true)?;
                self.compile(rhs, true)?;
                self.emit(Instruction::SetField(name.clone()))?;
                self.discard(value)
            }
            AssignTarget::Index { array, index } => {
                self.compile(array, true)?;
                self.compile(index, true)?;
                self.compile(rhs, true)?;
                self.emit(Instruction::SetIndex)?;
                self.discard(value)
            }
        }
    }

    /// Push a local slot, honoring cell addressing
    pub(crate) fn load_slot(&mut self, slot: SlotId) -> CompileResult<()> {
        let load = if self.unit().is_boxed(slot) {
            Instruction::LoadBoxedLocal(slot)
        } else {
            Instruction::LoadLocal(slot)
        };
        self.emit(load)?;
        Ok(())
    }

    /// Pop into a local slot, honoring cell addressing
    pub(crate) fn store_slot(&mut self, slot: SlotId, keep: bool) -> CompileResult<()> {
        let boxed = self.unit().is_boxed(slot);
        let store = match (boxed, keep) {
            (false, false) => Instruction::StoreLocalVoid(slot),
            (false, true) => Instruction::StoreLocal(slot),
            (true, false) => Instruction::StoreBoxedLocalVoid(slot),
            (true, true) => Instruction::StoreBoxedLocal(slot),
        };
        self.emit(store)?;
        Ok(())
    }

    fn load_variable(&mut self, variable: &Variable) -> CompileResult<()> {
        match self.unit().lookup_local(variable) {
            Some(slot) => self.load_slot(slot),
            None => {
                let index = self.closure_slot(variable)?;
                self.emit(Instruction::LoadClosure(index))?;
                Ok(())
            }
        }
    }

    fn store_variable(&mut self, variable: &Variable, keep: bool) -> CompileResult<()> {
        match self.unit().lookup_local(variable) {
            Some(slot) => self.store_slot(slot, keep),
            None => {
                let index = self.closure_slot(variable)?;
                self.emit(Instruction::StoreClosure(index))?;
                self.discard(keep)
            }
        }
    }

    fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        operand_kind: Option<ValueKind>,
        value: bool,
    ) -> CompileResult<()> {
        if matches!(op, BinaryOp::AndAlso | BinaryOp::OrElse) {
            return self.compile_short_circuit(op, left, right, value);
        }
        self.compile(left, true)?;
        self.compile(right, true)?;
        let instruction = match op {
            BinaryOp::Add => Instruction::Add,
            BinaryOp::Subtract => Instruction::Subtract,
            BinaryOp::Multiply => Instruction::Multiply,
            BinaryOp::Divide => Instruction::Divide,
            BinaryOp::Modulo => Instruction::Modulo,
            BinaryOp::Equal => typed_equality(operand_kind, false),
            BinaryOp::NotEqual => typed_equality(operand_kind, true),
            BinaryOp::LessThan => Instruction::LessThan,
            BinaryOp::LessThanOrEqual => Instruction::LessThanOrEqual,
            BinaryOp::GreaterThan => Instruction::GreaterThan,
            BinaryOp::GreaterThanOrEqual => Instruction::GreaterThanOrEqual,
            BinaryOp::AndAlso | BinaryOp::OrElse => {
                return Err(CompileError::Internal("short-circuit operator".into()))
            }
        };
        self.emit(instruction)?;
        self.discard(value)
    }

    /// `a && b` keeps `a` when it is falsy, otherwise evaluates to `b`.
    fn compile_short_circuit(
        &mut self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        value: bool,
    ) -> CompileResult<()> {
        let end = self.unit().list.new_label();
        self.compile(left, true)?;
        self.emit(Instruction::Dup)?;
        let branch = if op == BinaryOp::AndAlso {
            Instruction::BranchFalse(0)
        } else {
            Instruction::BranchTrue(0)
        };
        self.unit().list.emit_branch(branch, end)?;
        self.emit(Instruction::Pop)?;
        self.compile(right, true)?;
        self.unit().list.mark_label(end)?;
        self.discard(value)
    }

    fn compile_native_call(
        &mut self,
        function: NativeHandle,
        arguments: &[Node],
        value: bool,
    ) -> CompileResult<()> {
        let entry = self
            .registry
            .get(function)
            .cloned()
            .ok_or_else(|| {
                CompileError::Unsupported(format!("call of unregistered native #{}", function.0))
            })?;
        if entry.arity != arguments.len() {
            return Err(CompileError::Unsupported(format!(
                "native '{}' takes {} arguments, {} given",
                entry.name,
                entry.arity,
                arguments.len()
            )));
        }
        for argument in arguments {
            self.compile(argument, true)?;
        }
        let returns_value = entry.returns_value;
        self.emit(Instruction::CallNative(CallSite { entry }))?;
        if returns_value {
            self.discard(value)
        } else {
            self.push_nil(value)
        }
    }
}

fn typed_equality(kind: Option<ValueKind>, negated: bool) -> Instruction {
    match (kind, negated) {
        (Some(ValueKind::Int), false) => Instruction::EqualInt,
        (Some(ValueKind::Double), false) => Instruction::EqualDouble,
        (Some(ValueKind::Boolean), false) => Instruction::EqualBool,
        (Some(ValueKind::String), false) => Instruction::EqualString,
        (Some(ValueKind::Int), true) => Instruction::NotEqualInt,
        (Some(ValueKind::Double), true) => Instruction::NotEqualDouble,
        (Some(ValueKind::Boolean), true) => Instruction::NotEqualBool,
        (Some(ValueKind::String), true) => Instruction::NotEqualString,
        (_, false) => Instruction::Equal,
        (_, true) => Instruction::NotEqual,
    }
}
