//! Run loops and exception routing
//!
//! The general loop runs an instruction range and, when an instruction
//! fails, searches the unit's handler regions innermost first. A catch
//! region resumes execution at its target. A fault region runs its handler
//! range to completion and the search continues outward, so nested
//! `finally` blocks all run, innermost first. Handlers always start with an
//! empty evaluation stack.
//!
//! Units whose regions are all faults use a reduced loop that only looks
//! at handlers after a failure and never resumes inside the unit.

use crate::dispatch::execute;
use crate::frame::StackFrame;
use bytecode_system::{CompiledUnit, DispatchMode, ExceptionHandler, HandlerKind};
use core_types::{AbortReason, AbortSignal, RuntimeError, TraceEntry, Value};
use std::ops::Range;
use tracing::{debug, error, trace, warn};

/// Run `unit` on `frame` from its first instruction and return the value
/// left on the evaluation stack.
///
/// An exception escaping the unit gets a trace entry naming the faulting
/// instruction.
pub fn run(unit: &CompiledUnit, frame: &mut StackFrame) -> Result<Value, RuntimeError> {
    let runner = Runner {
        unit,
        signal: AbortSignal::current(),
    };
    let whole = 0..unit.instructions.len();
    let outcome = match unit.dispatch_mode {
        DispatchMode::General => runner.run_range(frame, whole),
        DispatchMode::FaultOnly => runner.run_fault_only(frame, whole),
    };
    outcome
        .and_then(|()| frame.pop())
        .map_err(|err| runner.escape(frame, err))
}

/// Run `unit` with the general loop regardless of its dispatch mode.
pub fn run_general(unit: &CompiledUnit, frame: &mut StackFrame) -> Result<Value, RuntimeError> {
    let runner = Runner {
        unit,
        signal: AbortSignal::current(),
    };
    runner
        .run_range(frame, 0..unit.instructions.len())
        .and_then(|()| frame.pop())
        .map_err(|err| runner.escape(frame, err))
}

struct Runner<'u> {
    unit: &'u CompiledUnit,
    signal: Option<AbortSignal>,
}

impl Runner<'_> {
    /// Execute one instruction, first raising a pending abort
    fn step(&self, frame: &mut StackFrame, ip: usize) -> Result<isize, RuntimeError> {
        if let Some(reason) = self.signal.as_ref().and_then(AbortSignal::take) {
            warn!(unit = %self.unit.name, instruction = ip, %reason, "abort raised");
            return Err(RuntimeError::Aborted(reason));
        }
        let instruction = self.unit.instructions.get(ip).ok_or_else(|| {
            RuntimeError::Internal(format!("instruction {} out of range", ip))
        })?;
        execute(instruction, frame)
    }

    /// Run until control leaves `range`.
    fn run_range(&self, frame: &mut StackFrame, range: Range<usize>) -> Result<(), RuntimeError> {
        let mut ip = range.start;
        while range.contains(&ip) {
            ip = match self.step(frame, ip) {
                Ok(delta) => advance(ip, delta)?,
                Err(err) => {
                    frame.fault_index = ip;
                    self.route(frame, &range, err)?
                }
            };
        }
        Ok(())
    }

    /// Find where execution resumes after `err`, running fault handlers on
    /// the way. Only handlers whose code lies in `range` are considered;
    /// anything else belongs to an outer run and is left to it.
    ///
    /// Once an abort is being unwound, an exception thrown by a fault
    /// handler does not replace it and cannot reach a catch region.
    fn route(
        &self,
        frame: &mut StackFrame,
        range: &Range<usize>,
        mut err: RuntimeError,
    ) -> Result<usize, RuntimeError> {
        let mut finished: Vec<Range<usize>> = Vec::new();
        let mut pending: Option<AbortReason> = None;
        'search: loop {
            match err {
                RuntimeError::Internal(_) => return Err(err),
                RuntimeError::Aborted(ref reason) => pending = Some(reason.clone()),
                RuntimeError::Thrown { .. } => {}
            }
            let thrown = err.exception().map(|e| e.exception_type().clone());
            let candidates: Vec<ExceptionHandler> = self
                .unit
                .handlers
                .candidates(frame.fault_index, thrown.as_ref(), |h| {
                    range.contains(&h.target) && !finished.iter().any(|r| r.contains(&h.target))
                })
                .into_iter()
                .cloned()
                .collect();

            for handler in candidates {
                frame.reset_stack(0);
                match handler.kind {
                    HandlerKind::Catch => {
                        trace!(unit = %self.unit.name, region = %handler, "entering catch handler");
                        if handler.push_exception {
                            if let Some(exception) = err.exception() {
                                frame.push(Value::Exception(exception.clone()))?;
                            }
                        }
                        return Ok(handler.target);
                    }
                    HandlerKind::Fault => {
                        let body = fault_body(&handler)?;
                        trace!(unit = %self.unit.name, region = %handler, "running fault handler");
                        let fault_index = frame.fault_index;
                        match self.run_range(frame, body.clone()) {
                            Ok(()) => frame.fault_index = fault_index,
                            Err(inner) => {
                                finished.push(body);
                                err = reassert(pending.as_ref(), inner);
                                continue 'search;
                            }
                        }
                    }
                }
            }
            return Err(err);
        }
    }

    /// Loop for units without catch regions.
    fn run_fault_only(&self, frame: &mut StackFrame, range: Range<usize>) -> Result<(), RuntimeError> {
        let mut ip = range.start;
        while range.contains(&ip) {
            match self.step(frame, ip) {
                Ok(delta) => ip = advance(ip, delta)?,
                Err(err) => {
                    frame.fault_index = ip;
                    return Err(self.unwind_faults(frame, &range, err));
                }
            }
        }
        Ok(())
    }

    /// Run every fault handler covering the faulting instruction, innermost
    /// first. A handler that fails replaces the error; the remaining
    /// handlers still run.
    fn unwind_faults(&self, frame: &mut StackFrame, range: &Range<usize>, mut err: RuntimeError) -> RuntimeError {
        if let RuntimeError::Internal(_) = err {
            return err;
        }
        let candidates: Vec<ExceptionHandler> = self
            .unit
            .handlers
            .candidates(frame.fault_index, None, |h| range.contains(&h.target))
            .into_iter()
            .cloned()
            .collect();
        let mut pending = match err {
            RuntimeError::Aborted(ref reason) => Some(reason.clone()),
            _ => None,
        };
        for handler in candidates {
            let body = match fault_body(&handler) {
                Ok(body) => body,
                Err(internal) => return internal,
            };
            trace!(unit = %self.unit.name, region = %handler, "running fault handler");
            frame.reset_stack(0);
            let fault_index = frame.fault_index;
            match self.run_fault_only(frame, body) {
                Ok(()) => frame.fault_index = fault_index,
                Err(RuntimeError::Internal(message)) => return RuntimeError::Internal(message),
                Err(inner) => {
                    if let RuntimeError::Aborted(ref reason) = inner {
                        pending = Some(reason.clone());
                    }
                    err = reassert(pending.as_ref(), inner);
                }
            }
        }
        err
    }

    /// Attach diagnostic context to an error leaving the unit
    fn escape(&self, frame: &StackFrame, err: RuntimeError) -> RuntimeError {
        match err {
            RuntimeError::Thrown { .. } => {
                let entry = TraceEntry {
                    unit: self.unit.name.clone(),
                    instruction: frame.fault_index,
                    span: self.unit.span_at(frame.fault_index),
                };
                debug!(
                    unit = %self.unit.name,
                    instruction = frame.fault_index,
                    exception = ?err.exception(),
                    "exception escapes unit"
                );
                err.with_trace(entry)
            }
            RuntimeError::Internal(ref message) => {
                error!(unit = %self.unit.name, instruction = frame.fault_index, %message, "interpreter invariant violated");
                err
            }
            RuntimeError::Aborted(_) => err,
        }
    }
}

/// Keep a pending abort in place of an exception thrown while unwinding it
fn reassert(pending: Option<&AbortReason>, inner: RuntimeError) -> RuntimeError {
    match (pending, inner) {
        (Some(reason), RuntimeError::Thrown { exception, .. }) => {
            debug!(%reason, %exception, "exception raised while unwinding an abort dropped");
            RuntimeError::Aborted(reason.clone())
        }
        (_, inner) => inner,
    }
}

fn fault_body(handler: &ExceptionHandler) -> Result<Range<usize>, RuntimeError> {
    handler
        .handler_end
        .map(|end| handler.target..end)
        .ok_or_else(|| RuntimeError::Internal(format!("fault region without handler end: {}", handler)))
}

fn advance(ip: usize, delta: isize) -> Result<usize, RuntimeError> {
    ip.checked_add_signed(delta)
        .ok_or_else(|| RuntimeError::Internal(format!("branch from {} by {} leaves the unit", ip, delta)))
}
