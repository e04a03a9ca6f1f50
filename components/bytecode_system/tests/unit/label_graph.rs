//! Random branch/label graphs: the depth recorded at every label must equal
//! the depth obtained by walking every path through the emitted code.

use bytecode_system::{Instruction, InstructionList, LabelId};
use core_types::Value;
use proptest::collection::vec;
use proptest::prelude::*;

const LABELS: usize = 6;
const MAX_DEPTH: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Push,
    Pop,
    Jump(usize),
    JumpIfFalse(usize),
    Goto(usize),
    Mark(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Push),
        2 => Just(Op::Pop),
        2 => (0..LABELS).prop_map(Op::Jump),
        2 => (0..LABELS).prop_map(Op::JumpIfFalse),
        1 => (0..LABELS).prop_map(Op::Goto),
        3 => (0..LABELS).prop_map(Op::Mark),
    ]
}

fn adjust(list: &mut InstructionList, target: usize) {
    while list.depth() < target {
        list.emit(Instruction::Push(Value::Boolean(false))).unwrap();
    }
    while list.depth() > target {
        list.emit(Instruction::Pop).unwrap();
    }
}

struct Built {
    instructions: Vec<Instruction>,
    max_depth: usize,
    labels: Vec<(Option<usize>, Option<usize>)>,
}

fn build(depths: &[usize], ops: &[Op]) -> Built {
    let mut list = InstructionList::new();
    let labels: Vec<LabelId> = (0..LABELS).map(|_| list.new_label()).collect();
    let mut marked = [false; LABELS];

    for op in ops {
        match *op {
            Op::Push => {
                if list.depth() < MAX_DEPTH {
                    list.emit(Instruction::Push(Value::Int(1))).unwrap();
                }
            }
            Op::Pop => {
                if list.depth() > 0 {
                    list.emit(Instruction::Pop).unwrap();
                }
            }
            Op::Jump(l) => {
                adjust(&mut list, depths[l]);
                list.emit_branch(Instruction::Branch(0), labels[l]).unwrap();
            }
            Op::JumpIfFalse(l) => {
                adjust(&mut list, depths[l] + 1);
                list.emit_branch(Instruction::BranchFalse(0), labels[l]).unwrap();
            }
            Op::Goto(l) => {
                list.emit_goto(labels[l], false, false).unwrap();
            }
            Op::Mark(l) => {
                if !marked[l] {
                    adjust(&mut list, depths[l]);
                    list.mark_label(labels[l]).unwrap();
                    marked[l] = true;
                }
            }
        }
    }
    for (l, done) in marked.iter().enumerate() {
        if !done {
            adjust(&mut list, depths[l]);
            list.mark_label(labels[l]).unwrap();
        }
    }

    let label_info = labels
        .iter()
        .map(|&l| (list.label_index(l), list.label_depth(l)))
        .collect();
    let (instructions, max_depth) = list.finish().unwrap();
    Built {
        instructions,
        max_depth,
        labels: label_info,
    }
}

/// Depth on entry to every instruction reachable from index 0; index
/// `len` stands for the end of the code.
fn walk(instructions: &[Instruction]) -> Result<Vec<Option<usize>>, String> {
    let len = instructions.len();
    let mut depth_at: Vec<Option<usize>> = vec![None; len + 1];
    let mut work = vec![(0usize, 0usize)];

    while let Some((index, depth)) = work.pop() {
        match depth_at[index] {
            Some(seen) if seen == depth => continue,
            Some(seen) => return Err(format!("index {} reached at {} and {}", index, seen, depth)),
            None => depth_at[index] = Some(depth),
        }
        if index == len {
            continue;
        }
        let instruction = &instructions[index];
        let after = depth - instruction.consumed() + instruction.produced();
        let jump = |offset: i32| (index as i64 + offset as i64) as usize;
        match instruction {
            Instruction::Branch(o) => work.push((jump(*o), after)),
            Instruction::BranchFalse(o) | Instruction::BranchTrue(o) => {
                work.push((jump(*o), after));
                work.push((index + 1, after));
            }
            Instruction::Goto(target) => work.push((jump(target.offset), target.target_depth)),
            _ => work.push((index + 1, after)),
        }
    }
    Ok(depth_at)
}

proptest! {
    #[test]
    fn label_depths_match_every_path(
        depths in vec(0usize..3, LABELS),
        ops in vec(op(), 1..80),
    ) {
        let built = build(&depths, &ops);
        let depth_at = walk(&built.instructions).map_err(TestCaseError::fail)?;

        for (l, (index, depth)) in built.labels.iter().enumerate() {
            let index = index.expect("every label is marked");
            prop_assert_eq!(*depth, Some(depths[l]));
            if let Some(observed) = depth_at[index] {
                prop_assert_eq!(observed, depths[l], "label {} at {}", l, index);
            }
        }
        for observed in depth_at.iter().flatten() {
            prop_assert!(*observed <= built.max_depth);
        }
    }
}
