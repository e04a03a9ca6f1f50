//! The stack instruction set
//!
//! Every instruction declares how many operands it pops and pushes. The
//! compiler relies on these counts to simulate the evaluation stack; the
//! interpreter trusts them and never re-checks depths at run time.

use crate::opcode::{CallSite, GotoTarget, SlotId, SwitchTable};
use crate::unit::CompiledUnit;
use core_types::Value;
use std::fmt;
use std::sync::Arc;

/// Stack machine instructions
#[derive(Debug, Clone)]
pub enum Instruction {
    // Stack
    /// Push a constant
    Push(Value),
    /// Discard the top of stack
    Pop,
    /// Duplicate the top of stack
    Dup,

    // Plain locals
    /// Reset a local to nil
    InitLocal(SlotId),
    /// Push a local
    LoadLocal(SlotId),
    /// Store the top of stack into a local, keeping it on the stack
    StoreLocal(SlotId),
    /// Pop the top of stack into a local
    StoreLocalVoid(SlotId),

    // Boxed locals (the slot holds a closure cell)
    /// Put a fresh cell holding nil into a local
    InitBoxedLocal(SlotId),
    /// Push the value inside a local's cell
    LoadBoxedLocal(SlotId),
    /// Store into a local's cell, keeping the value on the stack
    StoreBoxedLocal(SlotId),
    /// Pop into a local's cell
    StoreBoxedLocalVoid(SlotId),
    /// Push a local's cell itself
    LoadLocalCell(SlotId),

    // Outer cells (captured from enclosing activations)
    /// Push the value inside an outer cell
    LoadClosure(u32),
    /// Store into an outer cell, keeping the value on the stack
    StoreClosure(u32),
    /// Push an outer cell itself
    LoadClosureCell(u32),

    // Control
    /// Unconditional relative branch
    Branch(i32),
    /// Pop a boolean and branch when true
    BranchTrue(i32),
    /// Pop a boolean and branch when false
    BranchFalse(i32),
    /// Pop an integer selector and branch through a jump table
    Switch(Arc<SwitchTable>),
    /// Non-local jump resetting the evaluation stack to the label's depth
    Goto(GotoTarget),

    // Structured exceptions
    /// Marks the start of a catch handler; the interpreter has already
    /// pushed the exception when the region asks for it
    EnterExceptionHandler {
        /// Structurally accounts for the pushed exception
        pushes_exception: bool,
    },
    /// Leave a catch handler for the start of finally (or the try's end)
    LeaveExceptionHandler(i32),
    /// Pop a value and throw it
    Throw {
        /// Stands in an expression position
        has_result: bool,
    },
    /// Pop the exception of the enclosing catch and throw it again
    Rethrow {
        /// Stands in an expression position
        has_result: bool,
    },

    // Calls and closures
    /// Call a native function, popping its arguments in reverse order
    CallNative(CallSite),
    /// Pop arguments (reverse order) and a callee, push the result
    Invoke(u32),
    /// Pop captured cells (reverse order) and push a closure over them
    NewClosure {
        /// Unit of the nested lambda
        unit: Arc<CompiledUnit>,
        /// Number of cells popped
        captures: u32,
    },
    /// Pop cells (reverse order) into an array
    CollectCells(u32),

    // Construction and access
    /// Pop elements (reverse order) into a new array
    NewArray(u32),
    /// Pop field values (reverse order) into a new object
    NewObject(Arc<[Arc<str>]>),
    /// Pop an object, push one of its fields
    GetField(Arc<str>),
    /// Pop a value and an object, set the field, push the value
    SetField(Arc<str>),
    /// Pop an index and an array, push the element
    GetIndex,
    /// Pop a value, an index and an array, set the element, push the value
    SetIndex,

    // Operators
    /// Boolean negation
    Not,
    /// Arithmetic negation
    Negate,
    /// Addition or string concatenation
    Add,
    /// Subtraction
    Subtract,
    /// Multiplication
    Multiply,
    /// Division
    Divide,
    /// Remainder
    Modulo,
    /// Dynamic equality
    Equal,
    /// Dynamic inequality
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// Equality of two integers
    EqualInt,
    /// Equality of two doubles
    EqualDouble,
    /// Equality of two booleans
    EqualBool,
    /// Equality of two strings
    EqualString,
    /// Inequality of two integers
    NotEqualInt,
    /// Inequality of two doubles
    NotEqualDouble,
    /// Inequality of two booleans
    NotEqualBool,
    /// Inequality of two strings
    NotEqualString,
}

impl Instruction {
    /// Operands popped
    pub fn consumed(&self) -> usize {
        use Instruction::*;
        match self {
            Push(_) | InitLocal(_) | LoadLocal(_) | InitBoxedLocal(_) | LoadBoxedLocal(_)
            | LoadLocalCell(_) | LoadClosure(_) | LoadClosureCell(_) | Branch(_)
            | LeaveExceptionHandler(_) | EnterExceptionHandler { .. } => 0,
            Pop | Dup | StoreLocal(_) | StoreLocalVoid(_) | StoreBoxedLocal(_)
            | StoreBoxedLocalVoid(_) | StoreClosure(_) | BranchTrue(_) | BranchFalse(_)
            | Switch(_) | Throw { .. } | Rethrow { .. } | GetField(_) | Not | Negate => 1,
            Goto(target) => target.carries_value as usize,
            CallNative(site) => site.argc(),
            Invoke(argc) => *argc as usize + 1,
            NewClosure { captures, .. } => *captures as usize,
            CollectCells(n) | NewArray(n) => *n as usize,
            NewObject(names) => names.len(),
            SetField(_) | GetIndex => 2,
            SetIndex => 3,
            Add | Subtract | Multiply | Divide | Modulo | Equal | NotEqual | LessThan
            | LessThanOrEqual | GreaterThan | GreaterThanOrEqual | EqualInt | EqualDouble
            | EqualBool | EqualString | NotEqualInt | NotEqualDouble | NotEqualBool
            | NotEqualString => 2,
        }
    }

    /// Operands pushed
    pub fn produced(&self) -> usize {
        use Instruction::*;
        match self {
            Pop | InitLocal(_) | StoreLocalVoid(_) | InitBoxedLocal(_) | StoreBoxedLocalVoid(_)
            | Branch(_) | BranchTrue(_) | BranchFalse(_) | Switch(_)
            | LeaveExceptionHandler(_) => 0,
            Dup => 2,
            Goto(target) => target.has_result as usize,
            Throw { has_result } | Rethrow { has_result } => *has_result as usize,
            EnterExceptionHandler { pushes_exception } => *pushes_exception as usize,
            CallNative(site) => site.returns_value() as usize,
            _ => 1,
        }
    }

    /// Whether execution never falls through to the next instruction
    pub fn is_unconditional_transfer(&self) -> bool {
        matches!(
            self,
            Instruction::Branch(_)
                | Instruction::LeaveExceptionHandler(_)
                | Instruction::Goto(_)
                | Instruction::Throw { .. }
                | Instruction::Rethrow { .. }
        )
    }

    /// Cell-addressing form of a plain local access to `slot`, if this is
    /// one.
    pub fn boxed_form(&self, slot: SlotId) -> Option<Instruction> {
        match self {
            Instruction::InitLocal(s) if *s == slot => Some(Instruction::InitBoxedLocal(slot)),
            Instruction::LoadLocal(s) if *s == slot => Some(Instruction::LoadBoxedLocal(slot)),
            Instruction::StoreLocal(s) if *s == slot => Some(Instruction::StoreBoxedLocal(slot)),
            Instruction::StoreLocalVoid(s) if *s == slot => {
                Some(Instruction::StoreBoxedLocalVoid(slot))
            }
            _ => None,
        }
    }

    /// Patch a branch operand once its label is marked.
    ///
    /// `case` selects a switch arm; it is ignored by other instructions.
    pub(crate) fn fixup(&mut self, case: Option<i64>, offset: i32, depth: usize) -> bool {
        match self {
            Instruction::Branch(o)
            | Instruction::BranchTrue(o)
            | Instruction::BranchFalse(o)
            | Instruction::LeaveExceptionHandler(o) => {
                *o = offset;
                true
            }
            Instruction::Goto(target) => {
                target.offset = offset;
                target.target_depth = depth;
                true
            }
            Instruction::Switch(table) => match case {
                Some(key) => {
                    Arc::make_mut(table).cases.entry(key).or_insert(offset);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Mnemonic used in disassembly
    pub fn name(&self) -> &'static str {
        use Instruction::*;
        match self {
            Push(_) => "Push",
            Pop => "Pop",
            Dup => "Dup",
            InitLocal(_) => "InitLocal",
            LoadLocal(_) => "LoadLocal",
            StoreLocal(_) => "StoreLocal",
            StoreLocalVoid(_) => "StoreLocalVoid",
            InitBoxedLocal(_) => "InitBoxedLocal",
            LoadBoxedLocal(_) => "LoadBoxedLocal",
            StoreBoxedLocal(_) => "StoreBoxedLocal",
            StoreBoxedLocalVoid(_) => "StoreBoxedLocalVoid",
            LoadLocalCell(_) => "LoadLocalCell",
            LoadClosure(_) => "LoadClosure",
            StoreClosure(_) => "StoreClosure",
            LoadClosureCell(_) => "LoadClosureCell",
            Branch(_) => "Branch",
            BranchTrue(_) => "BranchTrue",
            BranchFalse(_) => "BranchFalse",
            Switch(_) => "Switch",
            Goto(_) => "Goto",
            EnterExceptionHandler { .. } => "EnterExceptionHandler",
            LeaveExceptionHandler(_) => "LeaveExceptionHandler",
            Throw { .. } => "Throw",
            Rethrow { .. } => "Rethrow",
            CallNative(_) => "CallNative",
            Invoke(_) => "Invoke",
            NewClosure { .. } => "NewClosure",
            CollectCells(_) => "CollectCells",
            NewArray(_) => "NewArray",
            NewObject(_) => "NewObject",
            GetField(_) => "GetField",
            SetField(_) => "SetField",
            GetIndex => "GetIndex",
            SetIndex => "SetIndex",
            Not => "Not",
            Negate => "Negate",
            Add => "Add",
            Subtract => "Subtract",
            Multiply => "Multiply",
            Divide => "Divide",
            Modulo => "Modulo",
            Equal => "Equal",
            NotEqual => "NotEqual",
            LessThan => "LessThan",
            LessThanOrEqual => "LessThanOrEqual",
            GreaterThan => "GreaterThan",
            GreaterThanOrEqual => "GreaterThanOrEqual",
            EqualInt => "EqualInt",
            EqualDouble => "EqualDouble",
            EqualBool => "EqualBool",
            EqualString => "EqualString",
            NotEqualInt => "NotEqualInt",
            NotEqualDouble => "NotEqualDouble",
            NotEqualBool => "NotEqualBool",
            NotEqualString => "NotEqualString",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        let name = self.name();
        match self {
            Push(value) => write!(f, "{}({:?})", name, value),
            InitLocal(s) | LoadLocal(s) | StoreLocal(s) | StoreLocalVoid(s) | InitBoxedLocal(s)
            | LoadBoxedLocal(s) | StoreBoxedLocal(s) | StoreBoxedLocalVoid(s)
            | LoadLocalCell(s) => write!(f, "{}({})", name, s.0),
            LoadClosure(i) | StoreClosure(i) | LoadClosureCell(i) => write!(f, "{}({})", name, i),
            Branch(o) | BranchTrue(o) | BranchFalse(o) | LeaveExceptionHandler(o) => {
                write!(f, "{}({:+})", name, o)
            }
            Switch(table) => {
                let mut cases: Vec<_> = table.cases.iter().collect();
                cases.sort();
                write!(f, "{}(", name)?;
                for (key, offset) in cases {
                    write!(f, "{}=>{:+} ", key, offset)?;
                }
                write!(f, "_=>{:+})", table.default_offset)
            }
            Goto(target) => write!(
                f,
                "{}({:+}, depth={}{})",
                name,
                target.offset,
                target.target_depth,
                if target.carries_value { ", value" } else { "" }
            ),
            CallNative(site) => write!(f, "{}({}/{})", name, site.entry.name, site.argc()),
            Invoke(argc) | CollectCells(argc) | NewArray(argc) => write!(f, "{}({})", name, argc),
            NewClosure { unit, captures } => write!(f, "{}({}, {})", name, unit.name, captures),
            NewObject(names) => write!(f, "{}({})", name, names.join(", ")),
            GetField(field) | SetField(field) => write!(f, "{}({})", name, field),
            _ => f.write_str(name),
        }
    }
}
