//! Per-unit promotion state
//!
//! One [`PromotionState`] is shared by every activation of a compiled unit.
//! The counter is bumped without coordination, so concurrent callers may
//! both see a pre-threshold count and both step past it; the claim flag is
//! the only thing that decides who requests compilation.

use crate::service::NativeCode;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};
use tracing::debug;

/// An activation that can switch to compiled dispatch in place.
pub trait Promotable: Send + Sync {
    /// Install the compiled body
    fn promote(&self, code: &Arc<dyn NativeCode>);
}

/// Promotion bookkeeping for one compiled unit.
pub struct PromotionState {
    threshold: u32,
    invocations: AtomicU32,
    claimed: AtomicBool,
    compiled: OnceLock<Arc<dyn NativeCode>>,
    pending: Mutex<Vec<Weak<dyn Promotable>>>,
    ready: Condvar,
}

impl PromotionState {
    /// Create state for a unit promoted after `threshold` calls
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            invocations: AtomicU32::new(0),
            claimed: AtomicBool::new(false),
            compiled: OnceLock::new(),
            pending: Mutex::new(Vec::new()),
            ready: Condvar::new(),
        }
    }

    /// Calls before promotion is requested
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Calls counted so far (saturates at the threshold)
    pub fn invocation_count(&self) -> u32 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Whether some caller has claimed the compilation
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// The compiled body, once published
    pub fn compiled(&self) -> Option<&Arc<dyn NativeCode>> {
        self.compiled.get()
    }

    /// Count one interpreted call.
    ///
    /// Returns `true` for exactly one caller: the one that must request
    /// compilation.
    pub fn record_invocation(&self) -> bool {
        let count = self.invocations.load(Ordering::Relaxed);
        if count < self.threshold {
            self.invocations.store(count + 1, Ordering::Relaxed);
            if count + 1 < self.threshold {
                return false;
            }
        }
        self.try_claim()
    }

    fn try_claim(&self) -> bool {
        self.compiled.get().is_none()
            && self
                .claimed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Track an interpreted activation for in-place upgrade.
    ///
    /// If the compiled body is already published the activation is not
    /// tracked and the body is returned instead.
    pub fn register(&self, activation: Weak<dyn Promotable>) -> Option<Arc<dyn NativeCode>> {
        let mut pending = self.pending.lock();
        if let Some(code) = self.compiled.get() {
            return Some(code.clone());
        }
        if pending.len() >= 64 && pending.len().is_power_of_two() {
            pending.retain(|weak| weak.strong_count() > 0);
        }
        pending.push(activation);
        None
    }

    /// Number of activations currently tracked
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Publish the compiled body and upgrade every live tracked activation.
    pub fn complete(&self, code: Arc<dyn NativeCode>) {
        if self.compiled.set(code).is_err() {
            return;
        }
        let Some(code) = self.compiled.get() else {
            return;
        };
        let mut pending = self.pending.lock();
        let drained: Vec<_> = pending.drain(..).collect();
        let mut upgraded = 0usize;
        for activation in drained.iter().filter_map(Weak::upgrade) {
            activation.promote(code);
            upgraded += 1;
        }
        debug!(upgraded, dropped = drained.len() - upgraded, "drained pending activations");
        self.ready.notify_all();
    }

    /// Block until the compiled body is published or `timeout` elapses.
    pub fn wait_compiled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while self.compiled.get().is_none() {
            if self.ready.wait_until(&mut pending, deadline).timed_out() {
                return self.compiled.get().is_some();
            }
        }
        true
    }
}

impl fmt::Debug for PromotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromotionState")
            .field("threshold", &self.threshold)
            .field("invocations", &self.invocation_count())
            .field("claimed", &self.is_claimed())
            .field("compiled", &self.compiled.get().is_some())
            .finish()
    }
}
