//! Asynchronous abort
//!
//! An [`AbortSignal`] is the one way to cancel running interpreted code. It
//! is bound to a thread with [`AbortSignal::bind`]; frames created on that
//! thread poll it between instructions.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why an abort was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortReason(pub String);

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct SignalInner {
    requested: AtomicBool,
    reason: Mutex<Option<AbortReason>>,
}

/// Externally injected asynchronous abort.
///
/// # Examples
///
/// ```
/// use core_types::{AbortReason, AbortSignal};
///
/// let signal = AbortSignal::new();
/// let _guard = signal.bind();
/// assert!(AbortSignal::current().is_some());
///
/// signal.request(AbortReason("shutdown".into()));
/// assert_eq!(signal.take(), Some(AbortReason("shutdown".into())));
/// assert_eq!(signal.take(), None);
/// ```
#[derive(Clone, Default)]
pub struct AbortSignal(Arc<SignalInner>);

thread_local! {
    static CURRENT: RefCell<Option<AbortSignal>> = const { RefCell::new(None) };
}

impl AbortSignal {
    /// Create an unrequested signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort; may be called from any thread.
    pub fn request(&self, reason: AbortReason) {
        *self.0.reason.lock() = Some(reason);
        self.0.requested.store(true, Ordering::Release);
    }

    /// Whether an abort is pending
    pub fn is_requested(&self) -> bool {
        self.0.requested.load(Ordering::Acquire)
    }

    /// Consume a pending request, returning its reason.
    pub fn take(&self) -> Option<AbortReason> {
        if self.0.requested.swap(false, Ordering::AcqRel) {
            let reason = self.0.reason.lock().take();
            Some(reason.unwrap_or_else(|| AbortReason("aborted".into())))
        } else {
            None
        }
    }

    /// Bind this signal to the current thread until the guard drops.
    pub fn bind(&self) -> AbortGuard {
        let previous = CURRENT.with(|slot| slot.replace(Some(self.clone())));
        AbortGuard { previous }
    }

    /// The signal bound to the current thread, if any.
    pub fn current() -> Option<AbortSignal> {
        CURRENT.with(|slot| slot.borrow().clone())
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("requested", &self.is_requested())
            .finish()
    }
}

/// Restores the previously bound signal on drop.
#[must_use]
pub struct AbortGuard {
    previous: Option<AbortSignal>,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}
