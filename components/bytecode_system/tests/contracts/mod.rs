//! Contract tests for the bytecode system public API

use bytecode_system::{
    BytecodeError, CompiledUnit, ExceptionHandler, HandlerTable, Instruction, InstructionList,
    UnitParts,
};
use core_types::{ExceptionType, Value};
use expr_tree::{LambdaTree, Node};
use std::collections::BTreeSet;
use std::sync::Arc;
use tiering::PromotionState;

fn unit_with(instructions: Vec<Instruction>, handlers: Vec<ExceptionHandler>) -> Result<CompiledUnit, BytecodeError> {
    CompiledUnit::new(UnitParts {
        name: Arc::from("contract"),
        instructions,
        handlers: HandlerTable::new(handlers),
        max_stack_depth: 2,
        local_count: 1,
        parameter_count: 1,
        boxed_slots: BTreeSet::new(),
        debug_info: vec![],
        lambda: Arc::new(LambdaTree::new("contract", vec![], Node::nil())),
        captured: vec![],
        promotion: Arc::new(PromotionState::new(4)),
        promoter: None,
    })
}

/// A unit exposes its side tables unchanged
#[test]
fn test_unit_contract() {
    let handler = ExceptionHandler::catch(0, 1, 1, Some(ExceptionType::type_error()), true);
    let unit = unit_with(vec![Instruction::Push(Value::Int(1))], vec![handler.clone()]).unwrap();
    assert_eq!(unit.instructions.len(), 1);
    assert_eq!(unit.handlers.handlers(), &[handler]);
    assert_eq!(unit.frame_size(), 3);
    assert_eq!(unit.promotion().threshold(), 4);
    assert!(unit.promoter().is_none());
    let request = unit.compile_request();
    assert_eq!(&*request.unit, "contract");
}

/// A list that references an unmarked label cannot be finished
#[test]
fn test_unbound_label_contract() {
    let mut list = InstructionList::new();
    let label = list.new_label();
    list.emit_branch(Instruction::Branch(0), label).unwrap();
    assert!(matches!(list.finish(), Err(BytecodeError::UnboundLabel(_))));
}

/// Fault regions must carry a handler end
#[test]
fn test_fault_region_contract() {
    let result = unit_with(vec![], vec![ExceptionHandler::fault(0, 0, 0)]);
    assert!(matches!(result, Err(BytecodeError::MissingHandlerEnd(0))));
}
