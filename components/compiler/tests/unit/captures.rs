//! Boxing of captured locals and cell threading through nested lambdas

use super::{compile, listing, nested};
use bytecode_system::SlotId;
use expr_tree::{LambdaTree, Node, Variable};
use pretty_assertions::assert_eq;

#[test]
fn test_capture_rewrites_earlier_accesses() {
    let x = Variable::new("x");
    let f = Variable::new("f");
    let unit = compile(LambdaTree::new(
        "outer",
        vec![],
        Node::block(
            vec![x.clone(), f.clone()],
            vec![
                Node::assign(&x, Node::int(1)),
                Node::assign(
                    &f,
                    Node::lambda(LambdaTree::new("reader", vec![], Node::var(&x))),
                ),
                Node::assign(&x, Node::int(2)),
                Node::invoke(Node::var(&f), vec![]),
            ],
        ),
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: InitBoxedLocal(0)",
            "1: InitLocal(1)",
            "2: Push(Int(1))",
            "3: StoreBoxedLocalVoid(0)",
            "4: LoadLocalCell(0)",
            "5: NewClosure(reader, 1)",
            "6: StoreLocalVoid(1)",
            "7: Push(Int(2))",
            "8: StoreBoxedLocalVoid(0)",
            "9: LoadLocal(1)",
            "10: Invoke(0)",
        ]
    );
    assert!(unit.is_boxed(SlotId(0)));
    assert!(!unit.is_boxed(SlotId(1)));

    let reader = nested(&unit);
    assert_eq!(listing(&reader), vec!["0: LoadClosure(0)"]);
    assert_eq!(reader.captured.len(), 1);
    assert_eq!(reader.captured[0], x);
}

#[test]
fn test_cells_thread_through_intermediate_lambda() {
    let x = Variable::new("x");
    let inner = LambdaTree::new("inner", vec![], Node::var(&x));
    let middle = LambdaTree::new("middle", vec![], Node::lambda(inner));
    let unit = compile(LambdaTree::new(
        "outer",
        vec![],
        Node::block(
            vec![x.clone()],
            vec![Node::assign(&x, Node::int(1)), Node::lambda(middle)],
        ),
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: InitBoxedLocal(0)",
            "1: Push(Int(1))",
            "2: StoreBoxedLocalVoid(0)",
            "3: LoadLocalCell(0)",
            "4: NewClosure(middle, 1)",
        ]
    );

    let middle = nested(&unit);
    assert_eq!(
        listing(&middle),
        vec!["0: LoadClosureCell(0)", "1: NewClosure(inner, 1)"]
    );
    assert_eq!(&*middle.captured, &[x.clone()]);

    let inner = nested(&middle);
    assert_eq!(listing(&inner), vec!["0: LoadClosure(0)"]);
}

#[test]
fn test_parameter_capture_and_closure_store() {
    let n = Variable::new("n");
    let bump = LambdaTree::new(
        "bump",
        vec![],
        Node::assign(&n, Node::add(Node::var(&n), Node::int(1))),
    );
    let unit = compile(LambdaTree::new("counter", vec![n.clone()], Node::lambda(bump)));
    assert_eq!(listing(&unit), vec!["0: LoadLocalCell(0)", "1: NewClosure(bump, 1)"]);
    assert!(unit.is_boxed(SlotId(0)));

    let bump = nested(&unit);
    assert_eq!(
        listing(&bump),
        vec![
            "0: LoadClosure(0)",
            "1: Push(Int(1))",
            "2: Add",
            "3: StoreClosure(0)",
        ]
    );
}

#[test]
fn test_captured_variables_collects_cells() {
    let a = Variable::new("a");
    let b = Variable::new("b");
    let unit = compile(LambdaTree::new(
        "cells",
        vec![a.clone(), b.clone()],
        Node::CapturedVariables(vec![b.clone(), a.clone()]),
    ));
    assert_eq!(
        listing(&unit),
        vec!["0: LoadLocalCell(1)", "1: LoadLocalCell(0)", "2: CollectCells(2)"]
    );
    assert_eq!(unit.boxed_slots.len(), 2);
}
