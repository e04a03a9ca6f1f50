//! Tests for Value and ClosureCell

use core_types::{ClosureCell, HostException, Value, ValueKind};
use std::sync::Arc;
use std::thread;

#[test]
fn test_value_kinds() {
    assert_eq!(Value::Nil.kind(), ValueKind::Nil);
    assert_eq!(Value::Int(1).kind(), ValueKind::Int);
    assert_eq!(Value::Double(1.5).kind(), ValueKind::Double);
    assert_eq!(Value::from("s").kind(), ValueKind::String);
    assert_eq!(Value::Cell(ClosureCell::default()).kind(), ValueKind::Cell);
    assert_eq!(
        Value::Exception(HostException::type_error("t")).kind(),
        ValueKind::Exception
    );
}

#[test]
fn test_cells_compare_by_identity() {
    let cell = ClosureCell::new(Value::Int(3));
    assert_eq!(Value::Cell(cell.clone()), Value::Cell(cell.clone()));
    assert_ne!(Value::Cell(cell), Value::Cell(ClosureCell::new(Value::Int(3))));
}

#[test]
fn test_cell_visible_across_threads() {
    let cell = ClosureCell::new(Value::Int(0));
    let writer = cell.clone();
    thread::spawn(move || writer.set(Value::Int(99)))
        .join()
        .unwrap();
    assert_eq!(cell.get(), Value::Int(99));
}

#[test]
fn test_accessors() {
    assert_eq!(Value::Boolean(true).as_bool(), Some(true));
    assert_eq!(Value::Int(5).as_int(), Some(5));
    assert_eq!(Value::from("abc").as_str(), Some("abc"));
    assert_eq!(Value::Nil.as_int(), None);
    let obj = Value::object(vec![(Arc::from("a"), Value::Int(1))]);
    assert!(obj.as_cell().is_none());
}
