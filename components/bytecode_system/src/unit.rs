//! Compiled units: instructions plus the side tables needed to run them

use crate::error::BytecodeError;
use crate::handler::{HandlerKind, HandlerTable};
use crate::instruction::Instruction;
use crate::opcode::SlotId;
use core_types::SourceSpan;
use expr_tree::{LambdaTree, Variable};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tiering::{CompileRequest, Promoter, PromotionState};

/// How the interpreter drives a unit, chosen once per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Catch regions present: exceptions may resume execution in the unit
    General,
    /// Only fault regions: an exception always leaves the unit
    FaultOnly,
}

/// Source span attached to a range of instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugInfo {
    /// First covered instruction
    pub start: usize,
    /// One past the last covered instruction
    pub end: usize,
    /// Source range
    pub span: SourceSpan,
}

/// Everything the compiler hands over to build a unit.
pub struct UnitParts {
    /// Diagnostic name
    pub name: Arc<str>,
    /// Instruction array
    pub instructions: Vec<Instruction>,
    /// Handler regions in emission order
    pub handlers: HandlerTable,
    /// Max evaluation stack depth
    pub max_stack_depth: usize,
    /// Number of local slots (parameters first)
    pub local_count: usize,
    /// Number of parameters
    pub parameter_count: usize,
    /// Slots holding closure cells
    pub boxed_slots: BTreeSet<SlotId>,
    /// Debug info entries
    pub debug_info: Vec<DebugInfo>,
    /// Source tree, kept for promotion
    pub lambda: Arc<LambdaTree>,
    /// Variables bound to the closure cells, in cell order
    pub captured: Vec<Variable>,
    /// Promotion state shared by all activations
    pub promotion: Arc<PromotionState>,
    /// Worker receiving compile requests, if promotion is enabled
    pub promoter: Option<Arc<Promoter>>,
}

/// Output of the compiler for one lambda.
pub struct CompiledUnit {
    /// Diagnostic name
    pub name: Arc<str>,
    /// Instruction array
    pub instructions: Box<[Instruction]>,
    /// Handler regions
    pub handlers: HandlerTable,
    /// Max evaluation stack depth
    pub max_stack_depth: usize,
    /// Number of local slots (parameters first)
    pub local_count: usize,
    /// Number of parameters
    pub parameter_count: usize,
    /// Slots holding closure cells
    pub boxed_slots: BTreeSet<SlotId>,
    /// Debug info entries
    pub debug_info: Vec<DebugInfo>,
    /// Source tree
    pub lambda: Arc<LambdaTree>,
    /// Variables bound to the closure cells, in cell order
    pub captured: Arc<[Variable]>,
    /// Dispatch strategy
    pub dispatch_mode: DispatchMode,
    promotion: Arc<PromotionState>,
    promoter: Option<Arc<Promoter>>,
}

impl CompiledUnit {
    /// Assemble a unit, checking that every fault region has a handler end.
    pub fn new(parts: UnitParts) -> Result<Self, BytecodeError> {
        if let Some(open) = parts
            .handlers
            .handlers()
            .iter()
            .find(|h| h.kind == HandlerKind::Fault && h.handler_end.is_none())
        {
            return Err(BytecodeError::MissingHandlerEnd(open.start));
        }
        let dispatch_mode = if parts.handlers.is_fault_only() {
            DispatchMode::FaultOnly
        } else {
            DispatchMode::General
        };
        Ok(Self {
            name: parts.name,
            instructions: parts.instructions.into_boxed_slice(),
            handlers: parts.handlers,
            max_stack_depth: parts.max_stack_depth,
            local_count: parts.local_count,
            parameter_count: parts.parameter_count,
            boxed_slots: parts.boxed_slots,
            debug_info: parts.debug_info,
            lambda: parts.lambda,
            captured: Arc::from(parts.captured),
            dispatch_mode,
            promotion: parts.promotion,
            promoter: parts.promoter,
        })
    }

    /// Size of a frame's value array
    pub fn frame_size(&self) -> usize {
        self.local_count + self.max_stack_depth
    }

    /// Whether `slot` holds a closure cell
    pub fn is_boxed(&self, slot: SlotId) -> bool {
        self.boxed_slots.contains(&slot)
    }

    /// Innermost source span covering `index`
    pub fn span_at(&self, index: usize) -> Option<SourceSpan> {
        self.debug_info
            .iter()
            .filter(|d| d.start <= index && index < d.end)
            .min_by_key(|d| d.end - d.start)
            .map(|d| d.span)
    }

    /// Promotion state shared by all activations
    pub fn promotion(&self) -> &Arc<PromotionState> {
        &self.promotion
    }

    /// Worker receiving compile requests
    pub fn promoter(&self) -> Option<&Arc<Promoter>> {
        self.promoter.as_ref()
    }

    /// Request describing this unit to the native compiler
    pub fn compile_request(&self) -> CompileRequest {
        CompileRequest {
            unit: self.name.clone(),
            tree: self.lambda.clone(),
            captured: self.captured.clone(),
            state: self.promotion.clone(),
        }
    }

    /// One line per instruction, prefixed with its index
    pub fn disassemble(&self) -> Vec<String> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, instruction)| format!("{:4}: {}", i, instruction))
            .collect()
    }
}

impl fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("name", &self.name)
            .field("instructions", &self.instructions.len())
            .field("handlers", &self.handlers.handlers().len())
            .field("max_stack_depth", &self.max_stack_depth)
            .field("local_count", &self.local_count)
            .field("boxed_slots", &self.boxed_slots)
            .field("dispatch_mode", &self.dispatch_mode)
            .finish()
    }
}
