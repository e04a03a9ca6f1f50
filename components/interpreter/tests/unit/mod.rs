//! Unit tests for interpreter behavior, driven through compiled trees

use compiler::{Compiler, CompilerOptions};
use core_types::{ExceptionType, HostException, Invocable, NativeRegistry, Value};
use expr_tree::{BinaryOp, LabelTarget, LambdaTree, Node, SwitchCase, Variable};
use interpreter::{Activate, LightClosure};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn activate_with(registry: &NativeRegistry, tree: LambdaTree) -> Arc<LightClosure> {
    Compiler::new(registry, CompilerOptions::default())
        .compile(&tree)
        .unwrap()
        .create_activation(Vec::new())
}

fn evaluate(body: Node) -> Result<Value, core_types::RuntimeError> {
    activate_with(&NativeRegistry::new(), LambdaTree::new("test", vec![], body)).call(&[])
}

// ============================================================================
// Sequencing and control flow
// ============================================================================

#[test]
fn test_loop_sums_range() {
    let i = Variable::new("i");
    let total = Variable::new("total");
    let done = LabelTarget::new("done");
    let body = Node::block(
        vec![i.clone(), total.clone()],
        vec![
            Node::assign(&i, Node::int(1)),
            Node::assign(&total, Node::int(0)),
            Node::loop_with(
                Node::seq(vec![
                    Node::if_then(
                        Node::binary(BinaryOp::GreaterThan, Node::var(&i), Node::int(10)),
                        Node::goto(&done),
                    ),
                    Node::assign(&total, Node::add(Node::var(&total), Node::var(&i))),
                    Node::assign(&i, Node::add(Node::var(&i), Node::int(1))),
                ]),
                Some(done.clone()),
                None,
            ),
            Node::var(&total),
        ],
    );
    assert_eq!(evaluate(body).unwrap(), Value::Int(55));
}

#[test]
fn test_continue_label_restarts_loop() {
    let i = Variable::new("i");
    let odd = Variable::new("odd");
    let done = LabelTarget::new("done");
    let next = LabelTarget::new("next");
    let body = Node::block(
        vec![i.clone(), odd.clone()],
        vec![
            Node::assign(&i, Node::int(0)),
            Node::assign(&odd, Node::int(0)),
            Node::loop_with(
                Node::seq(vec![
                    Node::assign(&i, Node::add(Node::var(&i), Node::int(1))),
                    Node::if_then(
                        Node::binary(BinaryOp::GreaterThan, Node::var(&i), Node::int(6)),
                        Node::goto(&done),
                    ),
                    Node::if_then(
                        Node::typed_binary(
                            BinaryOp::Equal,
                            core_types::ValueKind::Int,
                            Node::binary(BinaryOp::Modulo, Node::var(&i), Node::int(2)),
                            Node::int(0),
                        ),
                        Node::goto(&next),
                    ),
                    Node::assign(&odd, Node::add(Node::var(&odd), Node::int(1))),
                ]),
                Some(done.clone()),
                Some(next.clone()),
            ),
            Node::var(&odd),
        ],
    );
    assert_eq!(evaluate(body).unwrap(), Value::Int(3));
}

#[test]
fn test_conditional_without_else_is_nil() {
    let body = Node::if_then(Node::boolean(false), Node::int(1));
    assert_eq!(evaluate(body).unwrap(), Value::Nil);
    let body = Node::if_else(Node::int(0), Node::int(1), Node::int(2));
    assert_eq!(evaluate(body).unwrap(), Value::Int(2));
}

#[test]
fn test_short_circuit_keeps_deciding_operand() {
    let and = Node::binary(BinaryOp::AndAlso, Node::int(0), Node::int(5));
    assert_eq!(evaluate(and).unwrap(), Value::Int(0));
    let or = Node::binary(BinaryOp::OrElse, Node::nil(), Node::constant("x"));
    assert_eq!(evaluate(or).unwrap(), Value::from("x"));
}

#[test]
fn test_switch_unmatched_without_default_falls_through() {
    let pick = |selector: Node| {
        Node::switch(
            selector,
            vec![
                SwitchCase::new(vec![1], Node::int(10)),
                SwitchCase::new(vec![2, 3], Node::int(20)),
            ],
            None,
        )
    };
    assert_eq!(evaluate(pick(Node::int(3))).unwrap(), Value::Int(20));
    assert_eq!(evaluate(pick(Node::int(7))).unwrap(), Value::Nil);
    assert_eq!(evaluate(pick(Node::constant("1"))).unwrap(), Value::Nil);

    let with_default = Node::switch(
        Node::int(9),
        vec![SwitchCase::new(vec![1], Node::int(10))],
        Some(Node::int(-1)),
    );
    assert_eq!(evaluate(with_default).unwrap(), Value::Int(-1));
}

#[test]
fn test_goto_with_value_abandons_pending_operands() {
    let out = LabelTarget::with_value("out");
    let body = Node::label_with(
        &out,
        Node::add(Node::int(1), Node::goto_with(&out, Node::int(41))),
    );
    assert_eq!(evaluate(body).unwrap(), Value::Int(41));
}

#[test]
fn test_label_default_is_fall_through_value() {
    let out = LabelTarget::with_value("out");
    assert_eq!(evaluate(Node::label_with(&out, Node::int(8))).unwrap(), Value::Int(8));
}

// ============================================================================
// Data and natives
// ============================================================================

#[test]
fn test_objects_and_arrays() {
    let o = Variable::new("o");
    let body = Node::block(
        vec![o.clone()],
        vec![
            Node::assign(&o, Node::new_object(vec![("items", Node::NewArray(vec![Node::int(1), Node::int(2)]))])),
            Node::assign_index(Node::field(Node::var(&o), "items"), Node::int(1), Node::int(5)),
            Node::assign_field(Node::var(&o), "extra", Node::int(3)),
            Node::add(
                Node::index(Node::field(Node::var(&o), "items"), Node::int(1)),
                Node::field(Node::var(&o), "extra"),
            ),
        ],
    );
    assert_eq!(evaluate(body).unwrap(), Value::Int(8));
}

#[test]
fn test_index_error_surfaces() {
    let body = Node::index(Node::NewArray(vec![]), Node::int(0));
    let err = evaluate(body).unwrap_err();
    assert_eq!(err.exception().unwrap().exception_type(), &ExceptionType::index_error());
}

#[test]
fn test_native_calls() {
    let mut registry = NativeRegistry::new();
    let square = registry.register("square", 1, true, |args: &[Value]| {
        let n = args[0].as_int().ok_or_else(|| HostException::type_error("int expected"))?;
        Ok(Value::Int(n * n))
    });
    let ignore = registry.register("ignore", 2, false, |_: &[Value]| Ok(Value::Int(99)));

    let tree = LambdaTree::new(
        "natives",
        vec![],
        Node::NewArray(vec![
            Node::call(square, vec![Node::int(7)]),
            Node::call(ignore, vec![Node::int(1), Node::int(2)]),
        ]),
    );
    let result = activate_with(&registry, tree).call(&[]).unwrap();
    assert_eq!(format!("{}", result), "[49, nil]");

    let tree = LambdaTree::new("bad", vec![], Node::call(square, vec![Node::nil()]));
    let err = activate_with(&registry, tree).call(&[]).unwrap_err();
    assert_eq!(err.exception().unwrap().message(), "int expected");
}

#[test]
fn test_arguments_bind_to_parameters() {
    let a = Variable::new("a");
    let b = Variable::new("b");
    let tree = LambdaTree::new(
        "minus",
        vec![a.clone(), b.clone()],
        Node::binary(BinaryOp::Subtract, Node::var(&a), Node::var(&b)),
    );
    let minus = activate_with(&NativeRegistry::new(), tree);
    assert_eq!(minus.call(&[Value::Int(10), Value::Int(3)]).unwrap(), Value::Int(7));
    assert!(minus.call(&[Value::Int(10)]).is_err());
}

// ============================================================================
// Closures
// ============================================================================

#[test]
fn test_counter_closure_shares_cell() {
    let count = Variable::new("count");
    let bump = LambdaTree::new(
        "bump",
        vec![],
        Node::assign(&count, Node::add(Node::var(&count), Node::int(1))),
    );
    let tree = LambdaTree::new(
        "make_counter",
        vec![],
        Node::block(
            vec![count.clone()],
            vec![Node::assign(&count, Node::int(0)), Node::lambda(bump)],
        ),
    );
    let make_counter = activate_with(&NativeRegistry::new(), tree);

    let first = make_counter.call(&[]).unwrap();
    let second = make_counter.call(&[]).unwrap();
    let (Value::Function(first), Value::Function(second)) = (first, second) else {
        panic!("expected closures");
    };
    assert_eq!(first.call(&[]).unwrap(), Value::Int(1));
    assert_eq!(first.call(&[]).unwrap(), Value::Int(2));
    assert_eq!(second.call(&[]).unwrap(), Value::Int(1));
}

#[test]
fn test_captured_variables_yields_cells() {
    let x = Variable::new("x");
    let tree = LambdaTree::new(
        "cells",
        vec![x.clone()],
        Node::CapturedVariables(vec![x.clone()]),
    );
    let result = activate_with(&NativeRegistry::new(), tree)
        .call(&[Value::Int(4)])
        .unwrap();
    let Value::Array(cells) = result else {
        panic!("expected array");
    };
    let cells = cells.read();
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].as_cell().unwrap().get(), Value::Int(4));
}
