//! Unit tests for the compiler

mod captures;
mod lowering;

use bytecode_system::CompiledUnit;
use compiler::{Compiler, CompilerOptions};
use core_types::NativeRegistry;
use expr_tree::LambdaTree;
use std::sync::Arc;

pub fn compile(tree: LambdaTree) -> Arc<CompiledUnit> {
    let registry = NativeRegistry::new();
    Compiler::new(&registry, CompilerOptions::default())
        .compile(&tree)
        .unwrap()
}

pub fn listing(unit: &CompiledUnit) -> Vec<String> {
    unit.disassemble()
        .into_iter()
        .map(|line| line.trim_start().to_string())
        .collect()
}

pub fn nested(unit: &CompiledUnit) -> Arc<CompiledUnit> {
    unit.instructions
        .iter()
        .find_map(|i| match i {
            bytecode_system::Instruction::NewClosure { unit, .. } => Some(unit.clone()),
            _ => None,
        })
        .expect("unit creates a closure")
}
