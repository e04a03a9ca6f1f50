//! Tests for exception types and runtime errors

use core_types::{ExceptionType, HostException, RuntimeError, Value};

#[test]
fn test_hierarchy_matching() {
    let base = ExceptionType::derive("LookupError", &ExceptionType::root());
    let key = ExceptionType::derive("KeyError", &base);
    assert!(key.is_subtype_of(&base));
    assert!(key.is_subtype_of(&ExceptionType::root()));
    assert!(!base.is_subtype_of(&key));
    assert_eq!(key.parent(), Some(&base));
}

#[test]
fn test_payload_and_message() {
    let exc = HostException::with_payload(ExceptionType::root(), "boom", Value::Int(7));
    assert_eq!(exc.message(), "boom");
    assert_eq!(exc.payload(), &Value::Int(7));
    assert_eq!(exc.to_string(), "Exception: boom");
}

#[test]
fn test_clone_keeps_identity() {
    let exc = HostException::arithmetic_error("division by zero");
    let copy = exc.clone();
    let other = HostException::arithmetic_error("division by zero");
    assert!(exc.same_identity(&copy));
    assert!(!exc.same_identity(&other));
}

#[test]
fn test_runtime_error_display() {
    let err = RuntimeError::Internal("missing handler end".into());
    assert_eq!(
        err.to_string(),
        "interpreter invariant violated: missing handler end"
    );
    assert!(err.exception().is_none());
}
