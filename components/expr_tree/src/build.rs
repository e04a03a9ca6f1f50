//! Convenience constructors for building trees by hand

use crate::node::{AssignTarget, BinaryOp, CatchBlock, LambdaTree, Node, SwitchCase, UnaryOp};
use crate::symbols::{LabelTarget, Variable};
use core_types::{ExceptionType, NativeHandle, SourceSpan, Value, ValueKind};
use std::sync::Arc;

impl Node {
    /// Constant node
    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Constant(value.into())
    }

    /// Integer constant
    pub fn int(n: i64) -> Self {
        Node::Constant(Value::Int(n))
    }

    /// Boolean constant
    pub fn boolean(b: bool) -> Self {
        Node::Constant(Value::Boolean(b))
    }

    /// Nil constant
    pub fn nil() -> Self {
        Node::Constant(Value::Nil)
    }

    /// Variable read
    pub fn var(variable: &Variable) -> Self {
        Node::Variable(variable.clone())
    }

    /// Assignment to a variable
    pub fn assign(variable: &Variable, value: Node) -> Self {
        Node::Assign {
            target: AssignTarget::Variable(variable.clone()),
            value: Box::new(value),
        }
    }

    /// Assignment to a field
    pub fn assign_field(object: Node, name: &str, value: Node) -> Self {
        Node::Assign {
            target: AssignTarget::Field {
                object: Box::new(object),
                name: Arc::from(name),
            },
            value: Box::new(value),
        }
    }

    /// Assignment to an array element
    pub fn assign_index(array: Node, index: Node, value: Node) -> Self {
        Node::Assign {
            target: AssignTarget::Index {
                array: Box::new(array),
                index: Box::new(index),
            },
            value: Box::new(value),
        }
    }

    /// Block with scoped variables
    pub fn block(variables: Vec<Variable>, body: Vec<Node>) -> Self {
        Node::Block { variables, body }
    }

    /// Block without variables
    pub fn seq(body: Vec<Node>) -> Self {
        Node::Block {
            variables: Vec::new(),
            body,
        }
    }

    /// Two-armed conditional
    pub fn if_else(test: Node, if_true: Node, if_false: Node) -> Self {
        Node::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Some(Box::new(if_false)),
        }
    }

    /// One-armed conditional
    pub fn if_then(test: Node, if_true: Node) -> Self {
        Node::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: None,
        }
    }

    /// Loop with optional break/continue targets
    pub fn loop_with(
        body: Node,
        break_label: Option<LabelTarget>,
        continue_label: Option<LabelTarget>,
    ) -> Self {
        Node::Loop {
            body: Box::new(body),
            break_label,
            continue_label,
        }
    }

    /// Label position without a default value
    pub fn label(target: &LabelTarget) -> Self {
        Node::Label {
            target: target.clone(),
            default: None,
        }
    }

    /// Label position yielding `default` on fall-through
    pub fn label_with(target: &LabelTarget, default: Node) -> Self {
        Node::Label {
            target: target.clone(),
            default: Some(Box::new(default)),
        }
    }

    /// Jump without a value
    pub fn goto(target: &LabelTarget) -> Self {
        Node::Goto {
            target: target.clone(),
            value: None,
        }
    }

    /// Jump delivering `value`
    pub fn goto_with(target: &LabelTarget, value: Node) -> Self {
        Node::Goto {
            target: target.clone(),
            value: Some(Box::new(value)),
        }
    }

    /// Switch over integer arms
    pub fn switch(value: Node, cases: Vec<SwitchCase>, default: Option<Node>) -> Self {
        Node::Switch {
            value: Box::new(value),
            cases,
            default: default.map(Box::new),
        }
    }

    /// try/finally
    pub fn try_finally(body: Node, finally: Node) -> Self {
        Node::Try {
            body: Box::new(body),
            handlers: Vec::new(),
            finally: Some(Box::new(finally)),
            fault: None,
        }
    }

    /// try/catch
    pub fn try_catch(body: Node, handlers: Vec<CatchBlock>) -> Self {
        Node::Try {
            body: Box::new(body),
            handlers,
            finally: None,
            fault: None,
        }
    }

    /// try/catch/finally
    pub fn try_catch_finally(body: Node, handlers: Vec<CatchBlock>, finally: Node) -> Self {
        Node::Try {
            body: Box::new(body),
            handlers,
            finally: Some(Box::new(finally)),
            fault: None,
        }
    }

    /// try/fault
    pub fn try_fault(body: Node, fault: Node) -> Self {
        Node::Try {
            body: Box::new(body),
            handlers: Vec::new(),
            finally: None,
            fault: Some(Box::new(fault)),
        }
    }

    /// Throw
    pub fn throw(value: Node) -> Self {
        Node::Throw(Box::new(value))
    }

    /// Unary operator
    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Untyped binary operator
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            operand_kind: None,
        }
    }

    /// Binary operator with a known operand kind
    pub fn typed_binary(op: BinaryOp, kind: ValueKind, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            operand_kind: Some(kind),
        }
    }

    /// `left + right`
    pub fn add(left: Node, right: Node) -> Self {
        Node::binary(BinaryOp::Add, left, right)
    }

    /// `left == right`
    pub fn equal(left: Node, right: Node) -> Self {
        Node::binary(BinaryOp::Equal, left, right)
    }

    /// `left < right`
    pub fn less_than(left: Node, right: Node) -> Self {
        Node::binary(BinaryOp::LessThan, left, right)
    }

    /// Native call
    pub fn call(function: NativeHandle, arguments: Vec<Node>) -> Self {
        Node::Call {
            function,
            arguments,
        }
    }

    /// Call of a function value
    pub fn invoke(callee: Node, arguments: Vec<Node>) -> Self {
        Node::Invoke {
            callee: Box::new(callee),
            arguments,
        }
    }

    /// Object construction
    pub fn new_object(fields: Vec<(&str, Node)>) -> Self {
        Node::NewObject {
            fields: fields
                .into_iter()
                .map(|(name, node)| (Arc::from(name), node))
                .collect(),
        }
    }

    /// Field read
    pub fn field(object: Node, name: &str) -> Self {
        Node::Field {
            object: Box::new(object),
            name: Arc::from(name),
        }
    }

    /// Element read
    pub fn index(array: Node, index: Node) -> Self {
        Node::Index {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    /// Nested closure
    pub fn lambda(tree: LambdaTree) -> Self {
        Node::Lambda(Arc::new(tree))
    }

    /// Source annotation
    pub fn debug_info(span: SourceSpan, body: Node) -> Self {
        Node::DebugInfo {
            span,
            body: Box::new(body),
        }
    }
}

impl SwitchCase {
    /// Arm for the given values
    pub fn new(values: Vec<i64>, body: Node) -> Self {
        Self { values, body }
    }
}

impl CatchBlock {
    /// Catch everything, binding the exception to `variable`
    pub fn all(variable: Option<Variable>, body: Node) -> Self {
        Self {
            filter: None,
            variable,
            body,
        }
    }

    /// Catch exceptions of `filter` (or derived types)
    pub fn typed(filter: ExceptionType, variable: Option<Variable>, body: Node) -> Self {
        Self {
            filter: Some(filter),
            variable,
            body,
        }
    }
}
