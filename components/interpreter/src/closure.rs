//! Closures over compiled units and their promotion
//!
//! A [`LightClosure`] is one activation of a compiled unit: the unit plus
//! the closure cells it captured. Calls are interpreted until the unit's
//! promotion state publishes compiled code, after which they go straight
//! to it with the same cells and arguments.

use crate::frame::StackFrame;
use crate::run::run;
use bytecode_system::CompiledUnit;
use core_types::{ClosureCell, HostException, Invocable, RuntimeError, Value};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tiering::{NativeCode, Promotable};
use tracing::trace;

/// An invocable closure running a [`CompiledUnit`]
pub struct LightClosure {
    unit: Arc<CompiledUnit>,
    cells: Arc<[ClosureCell]>,
    compiled: OnceLock<Arc<dyn NativeCode>>,
}

impl LightClosure {
    /// The unit this closure runs
    pub fn unit(&self) -> &Arc<CompiledUnit> {
        &self.unit
    }

    /// Cells captured from enclosing activations, in the unit's cell order
    pub fn cells(&self) -> &[ClosureCell] {
        &self.cells
    }

    /// Whether calls dispatch to compiled code
    pub fn is_promoted(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Run the unit in the interpreter, bypassing promotion.
    pub fn interpret(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        if args.len() != self.unit.parameter_count {
            return Err(HostException::type_error(format!(
                "'{}' takes {} arguments, {} given",
                self.unit.name,
                self.unit.parameter_count,
                args.len()
            ))
            .into());
        }
        let mut frame = StackFrame::new(&self.unit, self.cells.clone(), args);
        run(&self.unit, &mut frame)
    }

    /// Count this call and request compilation when it is the one that
    /// crosses the threshold. Returns code that is ready to use now.
    fn count_invocation(&self) -> Option<Arc<dyn NativeCode>> {
        let promoter = self.unit.promoter()?;
        let promotion = self.unit.promotion();
        if let Some(code) = promotion.compiled() {
            return Some(code.clone());
        }
        if !promotion.record_invocation() {
            return None;
        }
        let request = self.unit.compile_request();
        if promotion.threshold() == 0 {
            promoter.compile_now(request);
            promotion.compiled().cloned()
        } else {
            promoter.submit(request);
            None
        }
    }
}

impl Invocable for LightClosure {
    fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        if let Some(code) = self.compiled.get() {
            return code.call(&self.cells, args);
        }
        match self.count_invocation() {
            Some(code) => {
                self.promote(&code);
                code.call(&self.cells, args)
            }
            None => self.interpret(args),
        }
    }

    fn name(&self) -> &str {
        &self.unit.name
    }
}

impl Promotable for LightClosure {
    fn promote(&self, code: &Arc<dyn NativeCode>) {
        if self.compiled.set(code.clone()).is_ok() {
            trace!(unit = %self.unit.name, "activation promoted");
        }
    }
}

impl fmt::Debug for LightClosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightClosure")
            .field("unit", &self.unit.name)
            .field("cells", &self.cells.len())
            .field("promoted", &self.is_promoted())
            .finish()
    }
}

/// Creation of activations from a compiled unit
pub trait Activate {
    /// Bind `cells` (in the unit's captured order) and return the closure.
    ///
    /// With promotion enabled the activation is tracked by the unit's
    /// promotion state, or starts out promoted if code is already
    /// published.
    fn create_activation(&self, cells: Vec<ClosureCell>) -> Arc<LightClosure>;
}

impl Activate for Arc<CompiledUnit> {
    fn create_activation(&self, cells: Vec<ClosureCell>) -> Arc<LightClosure> {
        let closure = Arc::new(LightClosure {
            unit: self.clone(),
            cells: cells.into(),
            compiled: OnceLock::new(),
        });
        if self.promoter().is_some() {
            let tracked: Weak<dyn Promotable> = Arc::downgrade(&closure) as Weak<dyn Promotable>;
            if let Some(code) = self.promotion().register(tracked) {
                closure.promote(&code);
            }
        }
        closure
    }
}
