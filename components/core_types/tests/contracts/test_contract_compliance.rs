//! Contract tests for the public core_types API

use core_types::{Invocable, NativeRegistry, RuntimeError, Value};
use std::sync::Arc;

struct Constant(Value);

impl Invocable for Constant {
    fn call(&self, _args: &[Value]) -> Result<Value, RuntimeError> {
        Ok(self.0.clone())
    }
}

/// Invocable values can be stored in Value::Function and called
#[test]
fn test_invocable_contract() {
    let func: Arc<dyn Invocable> = Arc::new(Constant(Value::Int(4)));
    let value = Value::Function(func.clone());
    match value {
        Value::Function(f) => assert_eq!(f.call(&[]).unwrap(), Value::Int(4)),
        other => panic!("expected function, got {:?}", other),
    }
    assert_eq!(func.name(), "<anonymous>");
}

/// Registry handles are dense and stable
#[test]
fn test_registry_contract() {
    let mut registry = NativeRegistry::new();
    assert!(registry.is_empty());
    let a = registry.register("a", 0, true, |_: &[Value]| Ok(Value::Nil));
    let b = registry.register("b", 2, false, |_: &[Value]| Ok(Value::Nil));
    assert_eq!(a.0, 0);
    assert_eq!(b.0, 1);
    assert_eq!(registry.get(b).map(|e| e.arity), Some(2));
    assert!(registry.get(core_types::NativeHandle(9)).is_none());
}
