//! Tree node definitions

use crate::symbols::{LabelTarget, Variable};
use core_types::{ExceptionType, NativeHandle, SourceSpan, Value, ValueKind};
use std::sync::Arc;

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation of a boolean
    Not,
    /// Arithmetic negation
    Negate,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+` (also string concatenation)
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// Short-circuit `&&`
    AndAlso,
    /// Short-circuit `||`
    OrElse,
}

/// Left-hand side of an assignment
#[derive(Debug, Clone)]
pub enum AssignTarget {
    /// A variable in scope or captured from an enclosing lambda
    Variable(Variable),
    /// `object.name`
    Field {
        /// Object expression
        object: Box<Node>,
        /// Field name
        name: Arc<str>,
    },
    /// `array[index]`
    Index {
        /// Array expression
        array: Box<Node>,
        /// Index expression
        index: Box<Node>,
    },
}

/// One arm of a switch
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// Values selecting this arm
    pub values: Vec<i64>,
    /// Arm body
    pub body: Node,
}

/// One catch clause of a try
#[derive(Debug, Clone)]
pub struct CatchBlock {
    /// Catch only exceptions of this type (or derived); `None` catches all
    pub filter: Option<ExceptionType>,
    /// Variable receiving the exception
    pub variable: Option<Variable>,
    /// Handler body
    pub body: Node,
}

/// A closure body with its parameters.
#[derive(Debug, Clone)]
pub struct LambdaTree {
    /// Diagnostic name
    pub name: Arc<str>,
    /// Positional parameters
    pub parameters: Vec<Variable>,
    /// Body; its value is the result of a call
    pub body: Node,
}

impl LambdaTree {
    /// Create a lambda tree
    pub fn new(name: &str, parameters: Vec<Variable>, body: Node) -> Self {
        Self {
            name: Arc::from(name),
            parameters,
            body,
        }
    }
}

/// The closed set of node kinds the compiler accepts.
#[derive(Debug, Clone)]
pub enum Node {
    /// A constant value
    Constant(Value),

    /// Read a variable
    Variable(Variable),

    /// Assign to a variable, field or element; yields the assigned value
    Assign {
        /// Assignment target
        target: AssignTarget,
        /// Value expression
        value: Box<Node>,
    },

    /// Sequence with block-scoped variables; yields its last expression
    Block {
        /// Variables declared by the block, reset to nil on entry
        variables: Vec<Variable>,
        /// Expressions evaluated in order
        body: Vec<Node>,
    },

    /// `test ? if_true : if_false`
    Conditional {
        /// Condition
        test: Box<Node>,
        /// Taken when the condition is truthy
        if_true: Box<Node>,
        /// Taken otherwise; a missing arm yields nil
        if_false: Option<Box<Node>>,
    },

    /// Infinite loop left through its break label
    Loop {
        /// Loop body
        body: Box<Node>,
        /// Target positioned just after the loop
        break_label: Option<LabelTarget>,
        /// Target positioned at the top of the body
        continue_label: Option<LabelTarget>,
    },

    /// Positions a label; yields the carried value for value labels
    Label {
        /// The target positioned here
        target: LabelTarget,
        /// Fall-through value for value-carrying targets
        default: Option<Box<Node>>,
    },

    /// Non-local jump
    Goto {
        /// Destination
        target: LabelTarget,
        /// Value delivered to a value-carrying target
        value: Option<Box<Node>>,
    },

    /// Multi-way branch on an integer
    Switch {
        /// Selector expression
        value: Box<Node>,
        /// Arms; the first arm listing a value wins
        cases: Vec<SwitchCase>,
        /// Taken when no arm matches
        default: Option<Box<Node>>,
    },

    /// Structured exception handling
    Try {
        /// Protected body
        body: Box<Node>,
        /// Catch clauses in declaration order
        handlers: Vec<CatchBlock>,
        /// Runs on every exit from the try
        finally: Option<Box<Node>>,
        /// Runs only when an exception leaves the body
        fault: Option<Box<Node>>,
    },

    /// Throw a value; exceptions keep their identity, other values are
    /// wrapped
    Throw(Box<Node>),

    /// Re-throw the exception of the innermost enclosing catch
    Rethrow,

    /// Unary operator
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Node>,
    },

    /// Binary operator
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Node>,
        /// Right operand
        right: Box<Node>,
        /// Statically known operand kind, enables typed comparisons
        operand_kind: Option<ValueKind>,
    },

    /// Fixed-arity call of a registered native function
    Call {
        /// Registry handle
        function: NativeHandle,
        /// Arguments, evaluated left to right
        arguments: Vec<Node>,
    },

    /// Call a function value
    Invoke {
        /// Callee expression
        callee: Box<Node>,
        /// Arguments, evaluated left to right
        arguments: Vec<Node>,
    },

    /// Object construction
    NewObject {
        /// Field initializers, evaluated in order
        fields: Vec<(Arc<str>, Node)>,
    },

    /// Array construction
    NewArray(Vec<Node>),

    /// `object.name`
    Field {
        /// Object expression
        object: Box<Node>,
        /// Field name
        name: Arc<str>,
    },

    /// `array[index]`
    Index {
        /// Array expression
        array: Box<Node>,
        /// Index expression
        index: Box<Node>,
    },

    /// Nested closure
    Lambda(Arc<LambdaTree>),

    /// Array of the cells backing the listed variables
    CapturedVariables(Vec<Variable>),

    /// Attach a source span to the instructions of `body`
    DebugInfo {
        /// Source range
        span: SourceSpan,
        /// Annotated expression
        body: Box<Node>,
    },
}
