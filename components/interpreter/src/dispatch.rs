//! Dispatch of single instructions
//!
//! [`execute`] applies one instruction to a frame and returns the relative
//! offset of the next instruction. Exceptions come back as `Err` and are
//! routed by the run loop; this module never looks at handler regions.

use crate::closure::Activate;
use crate::frame::StackFrame;
use crate::operators;
use bytecode_system::Instruction;
use core_types::{ExceptionType, HostException, Invocable, RuntimeError, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Execute `instruction` against `frame`, returning the ip delta.
pub fn execute(instruction: &Instruction, frame: &mut StackFrame) -> Result<isize, RuntimeError> {
    use Instruction::*;
    match instruction {
        Push(value) => frame.push(value.clone())?,
        Pop => {
            frame.pop()?;
        }
        Dup => {
            let top = frame.peek()?;
            frame.push(top)?;
        }

        InitLocal(slot) => frame.set_local(*slot, Value::Nil),
        LoadLocal(slot) => frame.push(frame.local(*slot))?,
        StoreLocal(slot) => frame.set_local(*slot, frame.peek()?),
        StoreLocalVoid(slot) => {
            let value = frame.pop()?;
            frame.set_local(*slot, value);
        }

        InitBoxedLocal(slot) => {
            frame.set_local(*slot, Value::Cell(core_types::ClosureCell::new(Value::Nil)))
        }
        LoadBoxedLocal(slot) => {
            let value = frame.local_cell(*slot)?.get();
            frame.push(value)?;
        }
        StoreBoxedLocal(slot) => frame.local_cell(*slot)?.set(frame.peek()?),
        StoreBoxedLocalVoid(slot) => {
            let cell = frame.local_cell(*slot)?;
            cell.set(frame.pop()?);
        }
        LoadLocalCell(slot) => {
            let cell = frame.local_cell(*slot)?;
            frame.push(Value::Cell(cell))?;
        }

        LoadClosure(index) => {
            let value = frame.closure_cell(*index)?.get();
            frame.push(value)?;
        }
        StoreClosure(index) => frame.closure_cell(*index)?.set(frame.peek()?),
        LoadClosureCell(index) => {
            let cell = frame.closure_cell(*index)?.clone();
            frame.push(Value::Cell(cell))?;
        }

        Branch(offset) | LeaveExceptionHandler(offset) => return Ok(*offset as isize),
        BranchTrue(offset) => {
            if frame.pop()?.is_truthy() {
                return Ok(*offset as isize);
            }
        }
        BranchFalse(offset) => {
            if !frame.pop()?.is_truthy() {
                return Ok(*offset as isize);
            }
        }
        Switch(table) => {
            let selector = frame.pop()?;
            return Ok(table.offset_for(selector.as_int()) as isize);
        }
        Goto(target) => {
            if target.carries_value {
                let value = frame.pop()?;
                frame.reset_stack(target.target_depth.saturating_sub(1));
                frame.push(value)?;
            } else {
                frame.reset_stack(target.target_depth);
            }
            return Ok(target.offset as isize);
        }

        // The router has already pushed the exception, if any.
        EnterExceptionHandler { .. } => {}
        Throw { .. } => {
            let thrown = match frame.pop()? {
                Value::Exception(exception) => exception,
                other => HostException::with_payload(ExceptionType::root(), other.to_string(), other),
            };
            return Err(thrown.into());
        }
        Rethrow { .. } => {
            return match frame.pop()? {
                Value::Exception(exception) => Err(exception.into()),
                other => Err(RuntimeError::Internal(format!(
                    "rethrow of non-exception {:?}",
                    other
                ))),
            };
        }

        CallNative(site) => {
            let args = frame.pop_n(site.argc())?;
            let result = site.entry.function.invoke(&args)?;
            if site.returns_value() {
                frame.push(result)?;
            }
        }
        Invoke(argc) => {
            let args = frame.pop_n(*argc as usize)?;
            let result = match frame.pop()? {
                Value::Function(function) => function.call(&args)?,
                other => {
                    return Err(HostException::type_error(format!(
                        "{} is not callable",
                        other.kind()
                    ))
                    .into())
                }
            };
            frame.push(result)?;
        }
        NewClosure { unit, captures } => {
            let cells = frame
                .pop_n(*captures as usize)?
                .into_iter()
                .map(|value| match value {
                    Value::Cell(cell) => Ok(cell),
                    other => Err(RuntimeError::Internal(format!(
                        "closure capture is {:?}, not a cell",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let closure: Arc<dyn Invocable> = unit.create_activation(cells);
            frame.push(Value::Function(closure))?;
        }
        CollectCells(count) | NewArray(count) => {
            let items = frame.pop_n(*count as usize)?;
            frame.push(Value::array(items))?;
        }

        NewObject(names) => {
            let values = frame.pop_n(names.len())?;
            let fields: HashMap<Arc<str>, Value> = names.iter().cloned().zip(values).collect();
            frame.push(Value::object(fields))?;
        }
        GetField(name) => {
            let object = frame.pop()?;
            frame.push(operators::get_field(&object, name)?)?;
        }
        SetField(name) => {
            let value = frame.pop()?;
            let object = frame.pop()?;
            operators::set_field(&object, name, value.clone())?;
            frame.push(value)?;
        }
        GetIndex => {
            let index = frame.pop()?;
            let array = frame.pop()?;
            frame.push(operators::get_index(&array, &index)?)?;
        }
        SetIndex => {
            let value = frame.pop()?;
            let index = frame.pop()?;
            let array = frame.pop()?;
            operators::set_index(&array, &index, value.clone())?;
            frame.push(value)?;
        }

        Not => {
            let value = frame.pop()?;
            frame.push(Value::Boolean(!value.is_truthy()))?;
        }
        Negate => {
            let value = frame.pop()?;
            frame.push(operators::negate(value)?)?;
        }
        Add | Subtract | Multiply | Divide | Modulo => {
            let right = frame.pop()?;
            let left = frame.pop()?;
            frame.push(operators::arithmetic(instruction, left, right)?)?;
        }
        Equal | NotEqual | EqualInt | EqualDouble | EqualBool | EqualString | NotEqualInt
        | NotEqualDouble | NotEqualBool | NotEqualString => {
            let right = frame.pop()?;
            let left = frame.pop()?;
            let equal = operators::equals(instruction, &left, &right);
            let negated = matches!(
                instruction,
                NotEqual | NotEqualInt | NotEqualDouble | NotEqualBool | NotEqualString
            );
            frame.push(Value::Boolean(equal != negated))?;
        }
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            let right = frame.pop()?;
            let left = frame.pop()?;
            frame.push(operators::compare(instruction, &left, &right)?)?;
        }
    }
    Ok(1)
}
