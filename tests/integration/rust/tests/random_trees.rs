//! Random expression trees: compiled and interpreted results must agree
//! with a direct evaluation of the same tree.

use compiler::CompilerOptions;
use core_types::{Invocable, NativeRegistry, Value};
use expr_tree::{BinaryOp, LambdaTree, Node, SwitchCase, Variable};
use integration_tests::activate;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Expr {
    Int(i64),
    X,
    Y,
    Bin(BinaryOp, Box<Expr>, Box<Expr>),
    IfLess(Box<Expr>, Box<Expr>, Box<Expr>, Box<Expr>),
}

fn expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-9i64..=9).prop_map(Expr::Int),
        Just(Expr::X),
        Just(Expr::Y),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (
                prop_oneof![
                    Just(BinaryOp::Add),
                    Just(BinaryOp::Subtract),
                    Just(BinaryOp::Multiply)
                ],
                inner.clone(),
                inner.clone()
            )
                .prop_map(|(op, l, r)| Expr::Bin(op, Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone(), inner.clone(), inner).prop_map(|(a, b, t, f)| {
                Expr::IfLess(Box::new(a), Box::new(b), Box::new(t), Box::new(f))
            }),
        ]
    })
}

fn evaluate(e: &Expr, x: i64, y: i64) -> i64 {
    match e {
        Expr::Int(n) => *n,
        Expr::X => x,
        Expr::Y => y,
        Expr::Bin(op, l, r) => {
            let (l, r) = (evaluate(l, x, y), evaluate(r, x, y));
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Subtract => l - r,
                _ => l * r,
            }
        }
        Expr::IfLess(a, b, t, f) => {
            if evaluate(a, x, y) < evaluate(b, x, y) {
                evaluate(t, x, y)
            } else {
                evaluate(f, x, y)
            }
        }
    }
}

fn lower(e: &Expr, x: &Variable, y: &Variable) -> Node {
    match e {
        Expr::Int(n) => Node::int(*n),
        Expr::X => Node::var(x),
        Expr::Y => Node::var(y),
        Expr::Bin(op, l, r) => Node::binary(*op, lower(l, x, y), lower(r, x, y)),
        Expr::IfLess(a, b, t, f) => Node::if_else(
            Node::less_than(lower(a, x, y), lower(b, x, y)),
            lower(t, x, y),
            lower(f, x, y),
        ),
    }
}

proptest! {
    #[test]
    fn prop_interpreter_agrees_with_direct_evaluation(
        e in expr(),
        x in -20i64..=20,
        y in -20i64..=20,
    ) {
        let vx = Variable::new("x");
        let vy = Variable::new("y");
        let tree = LambdaTree::new("random", vec![vx.clone(), vy.clone()], lower(&e, &vx, &vy));
        let closure = activate(&NativeRegistry::new(), CompilerOptions::default(), tree);
        let result = closure.call(&[Value::Int(x), Value::Int(y)]).unwrap();
        prop_assert_eq!(result, Value::Int(evaluate(&e, x, y)));
        prop_assert!(closure.unit().max_stack_depth >= 1);
    }

    #[test]
    fn prop_switch_picks_first_matching_case(
        keys in proptest::collection::vec(proptest::collection::vec(0i64..8, 1..3), 1..5),
        selector in 0i64..10,
    ) {
        let cases: Vec<SwitchCase> = keys
            .iter()
            .enumerate()
            .map(|(i, values)| SwitchCase::new(values.clone(), Node::int(i as i64)))
            .collect();
        let tree = LambdaTree::new(
            "switch",
            vec![],
            Node::switch(Node::int(selector), cases, Some(Node::int(-1))),
        );
        let expected = keys
            .iter()
            .position(|values| values.contains(&selector))
            .map(|i| i as i64)
            .unwrap_or(-1);
        let closure = activate(&NativeRegistry::new(), CompilerOptions::default(), tree);
        prop_assert_eq!(closure.call(&[]).unwrap(), Value::Int(expected));
    }
}
