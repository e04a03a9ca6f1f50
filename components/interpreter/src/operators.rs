//! Operator semantics
//!
//! Integer arithmetic is checked: overflow and division by zero raise an
//! `ArithmeticError`. Mixed integer/double operands are computed as
//! doubles. Operand kinds the operator has no meaning for raise a
//! `TypeError`.

use bytecode_system::Instruction;
use core_types::{HostException, Value};
use std::cmp::Ordering;
use std::sync::Arc;

enum Numbers {
    Ints(i64, i64),
    Doubles(f64, f64),
}

fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(Numbers::Ints(*a, *b)),
        (Value::Int(a), Value::Double(b)) => Some(Numbers::Doubles(*a as f64, *b)),
        (Value::Double(a), Value::Int(b)) => Some(Numbers::Doubles(*a, *b as f64)),
        (Value::Double(a), Value::Double(b)) => Some(Numbers::Doubles(*a, *b)),
        _ => None,
    }
}

fn operand_error(op: &str, left: &Value, right: &Value) -> HostException {
    HostException::type_error(format!(
        "unsupported operands for {}: {} and {}",
        op,
        left.kind(),
        right.kind()
    ))
}

fn overflow(op: &str) -> HostException {
    HostException::arithmetic_error(format!("integer overflow in {}", op))
}

/// `Add`, `Subtract`, `Multiply`, `Divide` and `Modulo`
pub fn arithmetic(op: &Instruction, left: Value, right: Value) -> Result<Value, HostException> {
    let name = op.name();
    if let Instruction::Add = op {
        if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
            return Ok(Value::from(format!("{}{}", left, right)));
        }
    }
    let Some(operands) = numbers(&left, &right) else {
        return Err(operand_error(name, &left, &right));
    };
    match operands {
        Numbers::Ints(a, b) => {
            let result = match op {
                Instruction::Add => a.checked_add(b),
                Instruction::Subtract => a.checked_sub(b),
                Instruction::Multiply => a.checked_mul(b),
                Instruction::Divide | Instruction::Modulo if b == 0 => {
                    return Err(HostException::arithmetic_error("division by zero"))
                }
                Instruction::Divide => a.checked_div(b),
                Instruction::Modulo => a.checked_rem(b),
                _ => return Err(operand_error(name, &left, &right)),
            };
            result.map(Value::Int).ok_or_else(|| overflow(name))
        }
        Numbers::Doubles(a, b) => Ok(Value::Double(match op {
            Instruction::Add => a + b,
            Instruction::Subtract => a - b,
            Instruction::Multiply => a * b,
            Instruction::Divide => a / b,
            Instruction::Modulo => a % b,
            _ => return Err(operand_error(name, &left, &right)),
        })),
    }
}

/// Arithmetic negation
pub fn negate(value: Value) -> Result<Value, HostException> {
    match value {
        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| overflow("Negate")),
        Value::Double(n) => Ok(Value::Double(-n)),
        other => Err(HostException::type_error(format!(
            "cannot negate {}",
            other.kind()
        ))),
    }
}

/// Equality for the generic and the per-type comparison instructions.
///
/// A typed comparison whose operands do not have the expected kind falls
/// back to dynamic equality.
pub fn equals(op: &Instruction, left: &Value, right: &Value) -> bool {
    use Instruction::*;
    match (op, left, right) {
        (EqualInt | NotEqualInt, Value::Int(a), Value::Int(b)) => a == b,
        (EqualDouble | NotEqualDouble, Value::Double(a), Value::Double(b)) => a == b,
        (EqualBool | NotEqualBool, Value::Boolean(a), Value::Boolean(b)) => a == b,
        (EqualString | NotEqualString, Value::String(a), Value::String(b)) => a == b,
        _ => left == right,
    }
}

/// Ordering comparisons over numbers and strings
pub fn compare(op: &Instruction, left: &Value, right: &Value) -> Result<Value, HostException> {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match numbers(left, right) {
            Some(Numbers::Ints(a, b)) => Some(a.cmp(&b)),
            Some(Numbers::Doubles(a, b)) => a.partial_cmp(&b),
            None => return Err(operand_error(op.name(), left, right)),
        },
    };
    // NaN compares false both ways.
    let Some(ordering) = ordering else {
        return Ok(Value::Boolean(false));
    };
    let result = match op {
        Instruction::LessThan => ordering == Ordering::Less,
        Instruction::LessThanOrEqual => ordering != Ordering::Greater,
        Instruction::GreaterThan => ordering == Ordering::Greater,
        Instruction::GreaterThanOrEqual => ordering != Ordering::Less,
        _ => return Err(operand_error(op.name(), left, right)),
    };
    Ok(Value::Boolean(result))
}

fn element_index(index: &Value, len: usize) -> Result<usize, HostException> {
    let Some(n) = index.as_int() else {
        return Err(HostException::type_error(format!(
            "array index must be int, got {}",
            index.kind()
        )));
    };
    usize::try_from(n)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| HostException::index_error(format!("index {} out of range 0..{}", n, len)))
}

/// `array[index]`
pub fn get_index(array: &Value, index: &Value) -> Result<Value, HostException> {
    match array {
        Value::Array(items) => {
            let items = items.read();
            let i = element_index(index, items.len())?;
            Ok(items[i].clone())
        }
        other => Err(HostException::type_error(format!("cannot index {}", other.kind()))),
    }
}

/// `array[index] = value`
pub fn set_index(array: &Value, index: &Value, value: Value) -> Result<(), HostException> {
    match array {
        Value::Array(items) => {
            let mut items = items.write();
            let i = element_index(index, items.len())?;
            items[i] = value;
            Ok(())
        }
        other => Err(HostException::type_error(format!("cannot index {}", other.kind()))),
    }
}

/// `object.name`; a missing field reads as nil
pub fn get_field(object: &Value, name: &Arc<str>) -> Result<Value, HostException> {
    match object {
        Value::Object(fields) => Ok(fields.read().get(name).cloned().unwrap_or(Value::Nil)),
        other => Err(HostException::type_error(format!(
            "cannot read field '{}' of {}",
            name,
            other.kind()
        ))),
    }
}

/// `object.name = value`
pub fn set_field(object: &Value, name: &Arc<str>, value: Value) -> Result<(), HostException> {
    match object {
        Value::Object(fields) => {
            fields.write().insert(name.clone(), value);
            Ok(())
        }
        other => Err(HostException::type_error(format!(
            "cannot set field '{}' of {}",
            name,
            other.kind()
        ))),
    }
}
