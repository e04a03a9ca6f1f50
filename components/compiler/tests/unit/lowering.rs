//! Instruction sequences for sequencing, exceptions and jumps

use super::{compile, listing};
use bytecode_system::{HandlerKind, Instruction};
use core_types::{SourceSpan, ValueKind};
use expr_tree::{BinaryOp, CatchBlock, LabelTarget, LambdaTree, Node, Variable};
use pretty_assertions::assert_eq;

#[test]
fn test_block_assignments() {
    let a = Variable::new("a");
    let b = Variable::new("b");
    let unit = compile(LambdaTree::new(
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
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: InitLocal(0)",
            "1: InitLocal(1)",
            "2: Push(Int(1))",
            "3: StoreLocalVoid(0)",
            "4: Push(Int(2))",
            "5: StoreLocalVoid(1)",
            "6: LoadLocal(0)",
            "7: LoadLocal(1)",
            "8: Add",
        ]
    );
    assert_eq!(unit.max_stack_depth, 2);
    assert!(unit.handlers.is_empty());
}

#[test]
fn test_goto_out_of_finally_is_routed() {
    let x = Variable::new("x");
    let exit = LabelTarget::new("exit");
    let unit = compile(LambdaTree::new(
        "routed",
        vec![],
        Node::block(
            vec![x.clone()],
            vec![
                Node::try_finally(Node::goto(&exit), Node::assign(&x, Node::int(5))),
                Node::label(&exit),
                Node::int(7),
            ],
        ),
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: InitLocal(0)",
            "1: InitLocal(1)",
            "2: Goto(+1, depth=0)",
            "3: Push(Int(0))",
            "4: StoreLocalVoid(1)",
            "5: Branch(+1)",
            "6: Push(Int(5))",
            "7: StoreLocalVoid(0)",
            "8: LoadLocal(1)",
            "9: Switch(0=>+2 _=>+1)",
            "10: Branch(+2)",
            "11: Goto(+1, depth=0)",
            "12: Push(Int(7))",
        ]
    );
    let regions: Vec<String> = unit.handlers.handlers().iter().map(|h| h.to_string()).collect();
    assert_eq!(regions, vec!["fault [2, 6) -> [6, 8)"]);
    match &unit.instructions[2] {
        Instruction::Goto(target) => assert_eq!(target.via_finally, Some(6)),
        other => panic!("expected goto, got {}", other),
    }
}

#[test]
fn test_try_catch_value_uses_result_slot() {
    let e = Variable::new("e");
    let unit = compile(LambdaTree::new(
        "caught",
        vec![],
        Node::try_catch(
            Node::throw(Node::int(1)),
            vec![CatchBlock::all(Some(e.clone()), Node::var(&e))],
        ),
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: Push(Int(1))",
            "1: Throw",
            "2: EnterExceptionHandler",
            "3: InitLocal(1)",
            "4: StoreLocalVoid(1)",
            "5: LoadLocal(1)",
            "6: StoreLocalVoid(0)",
            "7: LeaveExceptionHandler(+1)",
            "8: LoadLocal(0)",
        ]
    );
    let regions: Vec<String> = unit.handlers.handlers().iter().map(|h| h.to_string()).collect();
    assert_eq!(regions, vec!["catch(*) [0, 2) -> 2 push"]);
}

#[test]
fn test_rethrow_only_catch_becomes_fault() {
    let unit = compile(LambdaTree::new(
        "observe",
        vec![],
        Node::try_catch(
            Node::throw(Node::int(1)),
            vec![CatchBlock::all(None, Node::Rethrow)],
        ),
    ));
    let handlers = unit.handlers.handlers();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].kind, HandlerKind::Fault);
    assert!(!handlers[0].push_exception);
    assert!(unit
        .instructions
        .iter()
        .all(|i| !matches!(i, Instruction::EnterExceptionHandler { .. } | Instruction::Rethrow { .. })));
}

#[test]
fn test_switch_layout() {
    let unit = compile(LambdaTree::new(
        "pick",
        vec![],
        Node::switch(
            Node::int(2),
            vec![
                expr_tree::SwitchCase::new(vec![1, 2], Node::int(10)),
                expr_tree::SwitchCase::new(vec![2, 3], Node::int(20)),
            ],
            None,
        ),
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: Push(Int(2))",
            "1: Switch(1=>+3 2=>+3 3=>+5 _=>+1)",
            "2: Push(Nil)",
            "3: Branch(+4)",
            "4: Push(Int(10))",
            "5: Branch(+2)",
            "6: Push(Int(20))",
        ]
    );
}

#[test]
fn test_typed_comparison_and_short_circuit() {
    let p = Variable::new("p");
    let unit = compile(LambdaTree::new(
        "both",
        vec![p.clone()],
        Node::binary(
            BinaryOp::AndAlso,
            Node::typed_binary(BinaryOp::Equal, ValueKind::Int, Node::var(&p), Node::int(3)),
            Node::boolean(true),
        ),
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: LoadLocal(0)",
            "1: Push(Int(3))",
            "2: EqualInt",
            "3: Dup",
            "4: BranchFalse(+3)",
            "5: Pop",
            "6: Push(Boolean(true))",
        ]
    );
    assert_eq!(unit.parameter_count, 1);
}

#[test]
fn test_debug_info_spans_recorded() {
    let unit = compile(LambdaTree::new(
        "spans",
        vec![],
        Node::seq(vec![
            Node::int(0),
            Node::debug_info(SourceSpan::lines(4, 4), Node::add(Node::int(1), Node::int(2))),
        ]),
    ));
    assert_eq!(unit.debug_info.len(), 1);
    assert_eq!(unit.debug_info[0].start, 0);
    assert_eq!(unit.debug_info[0].end, 3);
    assert_eq!(unit.span_at(2), Some(SourceSpan::lines(4, 4)));
}

#[test]
fn test_loop_with_break() {
    let i = Variable::new("i");
    let done = LabelTarget::new("done");
    let unit = compile(LambdaTree::new(
        "count",
        vec![],
        Node::block(
            vec![i.clone()],
            vec![
                Node::assign(&i, Node::int(0)),
                Node::loop_with(
                    Node::seq(vec![
                        Node::if_then(
                            Node::binary(BinaryOp::GreaterThanOrEqual, Node::var(&i), Node::int(3)),
                            Node::goto(&done),
                        ),
                        Node::assign(&i, Node::add(Node::var(&i), Node::int(1))),
                    ]),
                    Some(done.clone()),
                    None,
                ),
                Node::var(&i),
            ],
        ),
    ));
    assert_eq!(
        listing(&unit),
        vec![
            "0: InitLocal(0)",
            "1: Push(Int(0))",
            "2: StoreLocalVoid(0)",
            "3: LoadLocal(0)",
            "4: Push(Int(3))",
            "5: GreaterThanOrEqual",
            "6: BranchFalse(+2)",
            "7: Goto(+6, depth=0)",
            "8: LoadLocal(0)",
            "9: Push(Int(1))",
            "10: Add",
            "11: StoreLocalVoid(0)",
            "12: Branch(-9)",
            "13: LoadLocal(0)",
        ]
    );
    assert!(matches!(unit.instructions[7], Instruction::Goto(ref t) if t.via_finally.is_none()));
}
