//! End-to-end scenarios: tree -> compiler -> CompiledUnit -> interpreter

use compiler::CompilerOptions;
use core_types::{ExceptionType, HostException, Invocable, NativeRegistry, Value};
use expr_tree::{BinaryOp, CatchBlock, LabelTarget, LambdaTree, Node, SwitchCase, Variable};
use integration_tests::{activate, call_value, record, Recorder};
use interpreter::Activate;
use pretty_assertions::assert_eq;
use std::thread;

fn run(tree: LambdaTree) -> Value {
    activate(&NativeRegistry::new(), CompilerOptions::default(), tree)
        .call(&[])
        .unwrap()
}

#[test]
fn test_sum_on_independent_activations() {
    let a = Variable::new("a");
    let b = Variable::new("b");
    let tree = LambdaTree::new(
        "sum",
        vec![],
        Node::block(
            vec![a.clone(), b.clone()],
            vec![
                Node::assign(&a, Node::int(1)),
                Node::assign(&b, Node::int(2)),
                Node::add(Node::var(&a), Node::var(&b)),
            ],
        ),
    );
    let first = activate(&NativeRegistry::new(), CompilerOptions::default(), tree);
    let second = first.unit().create_activation(Vec::new());

    assert_eq!(first.call(&[]).unwrap(), Value::Int(3));
    assert_eq!(second.call(&[]).unwrap(), Value::Int(3));
    assert_eq!(first.call(&[]).unwrap(), Value::Int(3));
}

#[test]
fn test_activations_run_concurrently() {
    let n = Variable::new("n");
    let acc = Variable::new("acc");
    let done = LabelTarget::new("done");
    let tree = LambdaTree::new(
        "triangle",
        vec![n.clone()],
        Node::block(
            vec![acc.clone()],
            vec![
                Node::assign(&acc, Node::int(0)),
                Node::loop_with(
                    Node::seq(vec![
                        Node::if_then(
                            Node::less_than(Node::var(&n), Node::int(1)),
                            Node::goto(&done),
                        ),
                        Node::assign(&acc, Node::add(Node::var(&acc), Node::var(&n))),
                        Node::assign(
                            &n,
                            Node::binary(BinaryOp::Subtract, Node::var(&n), Node::int(1)),
                        ),
                    ]),
                    Some(done.clone()),
                    None,
                ),
                Node::var(&acc),
            ],
        ),
    );
    let closure = activate(&NativeRegistry::new(), CompilerOptions::default(), tree);

    let handles: Vec<_> = (1..=8i64)
        .map(|k| {
            let closure = closure.clone();
            thread::spawn(move || (k, closure.call(&[Value::Int(k * 10)]).unwrap()))
        })
        .collect();
    for handle in handles {
        let (k, result) = handle.join().unwrap();
        let n = k * 10;
        assert_eq!(result, Value::Int(n * (n + 1) / 2));
    }
}

#[test]
fn test_nested_finally_on_goto() {
    let recorder = Recorder::default();
    let mut registry = NativeRegistry::new();
    let rec = recorder.install(&mut registry);
    let l = LabelTarget::new("L");
    let tree = LambdaTree::new(
        "nested",
        vec![],
        Node::seq(vec![
            Node::try_finally(
                Node::try_finally(Node::goto(&l), record(rec, "F1")),
                record(rec, "F2"),
            ),
            record(rec, "skipped"),
            Node::label(&l),
            record(rec, "L"),
            Node::nil(),
        ]),
    );
    activate(&registry, CompilerOptions::default(), tree)
        .call(&[])
        .unwrap();
    assert_eq!(recorder.entries(), vec!["F1", "F2", "L"]);
}

#[test]
fn test_rethrow_only_catch_keeps_identity() {
    let mut registry = NativeRegistry::new();
    let original = HostException::new(ExceptionType::index_error(), "out of range");
    let raised = original.clone();
    let fail = registry.register("fail", 0, true, move |_: &[Value]| Err(raised.clone()));
    let tree = LambdaTree::new(
        "rethrow",
        vec![],
        Node::try_catch(
            Node::call(fail, vec![]),
            vec![CatchBlock::all(None, Node::Rethrow)],
        ),
    );
    let closure = activate(&registry, CompilerOptions::default(), tree);
    assert!(!closure
        .unit()
        .handlers
        .handlers()
        .iter()
        .any(|h| h.push_exception));

    let err = closure.call(&[]).unwrap_err();
    let escaped = err.exception().unwrap();
    assert!(escaped.same_identity(&original));
    assert_eq!(escaped.exception_type(), &ExceptionType::index_error());
    assert_eq!(escaped.message(), "out of range");
}

#[test]
fn test_mutation_after_capture_is_observed() {
    let x = Variable::new("x");
    let f = Variable::new("f");
    let reader = LambdaTree::new("reader", vec![], Node::var(&x));
    let tree = LambdaTree::new(
        "capture",
        vec![],
        Node::block(
            vec![x.clone(), f.clone()],
            vec![
                Node::assign(&x, Node::int(1)),
                Node::assign(&f, Node::lambda(reader)),
                Node::assign(&x, Node::int(2)),
                Node::invoke(Node::var(&f), vec![]),
            ],
        ),
    );
    assert_eq!(run(tree), Value::Int(2));
}

#[test]
fn test_closures_share_cells_across_calls() {
    let count = Variable::new("count");
    let bump = LambdaTree::new(
        "bump",
        vec![],
        Node::assign(&count, Node::add(Node::var(&count), Node::int(1))),
    );
    let read = LambdaTree::new("read", vec![], Node::var(&count));
    let tree = LambdaTree::new(
        "counter",
        vec![],
        Node::block(
            vec![count.clone()],
            vec![
                Node::assign(&count, Node::int(10)),
                Node::NewArray(vec![Node::lambda(bump), Node::lambda(read)]),
            ],
        ),
    );
    let pair = run(tree);
    let Value::Array(items) = pair else {
        panic!("expected an array");
    };
    let (bump, read) = {
        let items = items.read();
        (items[0].clone(), items[1].clone())
    };
    call_value(&bump, &[]).unwrap();
    call_value(&bump, &[]).unwrap();
    assert_eq!(call_value(&read, &[]).unwrap(), Value::Int(12));
}

#[test]
fn test_unmatched_switch_falls_through() {
    let recorder = Recorder::default();
    let mut registry = NativeRegistry::new();
    let rec = recorder.install(&mut registry);
    let tree = LambdaTree::new(
        "switch",
        vec![],
        Node::seq(vec![
            Node::switch(
                Node::int(42),
                vec![
                    SwitchCase::new(vec![1], record(rec, "one")),
                    SwitchCase::new(vec![2, 3], record(rec, "two or three")),
                ],
                None,
            ),
            record(rec, "after"),
            Node::int(0),
        ]),
    );
    activate(&registry, CompilerOptions::default(), tree)
        .call(&[])
        .unwrap();
    assert_eq!(recorder.entries(), vec!["after"]);
}

#[test]
fn test_switch_value_selects_case() {
    let k = Variable::new("k");
    let tree = LambdaTree::new(
        "classify",
        vec![k.clone()],
        Node::switch(
            Node::var(&k),
            vec![
                SwitchCase::new(vec![1], Node::constant("one")),
                SwitchCase::new(vec![2, 3], Node::constant("few")),
            ],
            Some(Node::constant("many")),
        ),
    );
    let classify = activate(&NativeRegistry::new(), CompilerOptions::default(), tree);
    let results: Vec<String> = (1..=4)
        .map(|n| classify.call(&[Value::Int(n)]).unwrap().to_string())
        .collect();
    assert_eq!(results, vec!["one", "few", "few", "many"]);
}

#[test]
fn test_uncaught_exception_keeps_type_and_message() {
    let tree = LambdaTree::new(
        "divide",
        vec![],
        Node::binary(BinaryOp::Divide, Node::int(1), Node::int(0)),
    );
    let err = activate(&NativeRegistry::new(), CompilerOptions::default(), tree)
        .call(&[])
        .unwrap_err();
    let exception = err.exception().unwrap();
    assert_eq!(exception.exception_type(), &ExceptionType::arithmetic_error());
    assert_eq!(exception.message(), "division by zero");
}
