//! Exception handler regions
//!
//! A region protects the half-open instruction range `[start, end)`. Catch
//! regions jump to their target and resume normal execution; fault regions
//! run `[target, handler_end)` and then let the exception continue outward.

use core_types::ExceptionType;
use std::fmt;

/// What a region does with a matching exception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Handles the exception; execution continues in the handler
    Catch,
    /// Observes the exception and lets it propagate
    Fault,
}

/// One protected range and its handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    /// First protected instruction
    pub start: usize,
    /// One past the last protected instruction
    pub end: usize,
    /// Catch or fault
    pub kind: HandlerKind,
    /// First instruction of the handler
    pub target: usize,
    /// One past the last instruction of a fault handler
    pub handler_end: Option<usize>,
    /// Catch filter; `None` catches every exception
    pub filter: Option<ExceptionType>,
    /// Whether the exception is pushed before entering the handler
    pub push_exception: bool,
}

impl ExceptionHandler {
    /// A typed catch region
    pub fn catch(
        start: usize,
        end: usize,
        target: usize,
        filter: Option<ExceptionType>,
        push_exception: bool,
    ) -> Self {
        Self {
            start,
            end,
            kind: HandlerKind::Catch,
            target,
            handler_end: None,
            filter,
            push_exception,
        }
    }

    /// A fault region; its handler end is set once the handler is emitted
    pub fn fault(start: usize, end: usize, target: usize) -> Self {
        Self {
            start,
            end,
            kind: HandlerKind::Fault,
            target,
            handler_end: None,
            filter: None,
            push_exception: false,
        }
    }

    /// Whether `index` lies in the protected range
    pub fn covers(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Whether this region handles an exception raised at `index`.
    ///
    /// `thrown` is `None` for an abort, which only fault regions observe.
    pub fn matches(&self, index: usize, thrown: Option<&ExceptionType>) -> bool {
        if !self.covers(index) {
            return false;
        }
        match self.kind {
            HandlerKind::Fault => true,
            HandlerKind::Catch => match (thrown, &self.filter) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(ty), Some(filter)) => ty.is_subtype_of(filter),
            },
        }
    }

    /// Innermost-first ordering: a narrower range wins, then an earlier
    /// start, then the handler emitted first.
    pub fn is_better_than(&self, other: &ExceptionHandler) -> bool {
        self.rank() < other.rank()
    }

    fn rank(&self) -> (usize, usize, usize) {
        (self.end - self.start, self.start, self.target)
    }
}

impl fmt::Display for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            HandlerKind::Catch => write!(
                f,
                "catch({}) [{}, {}) -> {}{}",
                self.filter.as_ref().map_or("*", |t| t.name()),
                self.start,
                self.end,
                self.target,
                if self.push_exception { " push" } else { "" }
            ),
            HandlerKind::Fault => write!(
                f,
                "fault [{}, {}) -> [{}, {})",
                self.start,
                self.end,
                self.target,
                self.handler_end.map_or_else(|| "?".to_string(), |e| e.to_string())
            ),
        }
    }
}

/// Handler regions of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerTable {
    handlers: Vec<ExceptionHandler>,
}

impl HandlerTable {
    /// Wrap regions in emission order
    pub fn new(handlers: Vec<ExceptionHandler>) -> Self {
        Self { handlers }
    }

    /// All regions in emission order
    pub fn handlers(&self) -> &[ExceptionHandler] {
        &self.handlers
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Whether every region is a fault region
    pub fn is_fault_only(&self) -> bool {
        self.handlers.iter().all(|h| h.kind == HandlerKind::Fault)
    }

    /// Regions matching an exception raised at `index`, best first, limited
    /// to those `eligible` accepts.
    pub fn candidates<F>(
        &self,
        index: usize,
        thrown: Option<&ExceptionType>,
        eligible: F,
    ) -> Vec<&ExceptionHandler>
    where
        F: Fn(&ExceptionHandler) -> bool,
    {
        let mut found: Vec<_> = self
            .handlers
            .iter()
            .filter(|h| h.matches(index, thrown) && eligible(h))
            .collect();
        found.sort_by_key(|h| h.rank());
        found
    }

    /// The single best region for an exception raised at `index`
    pub fn best(&self, index: usize, thrown: Option<&ExceptionType>) -> Option<&ExceptionHandler> {
        self.handlers
            .iter()
            .filter(|h| h.matches(index, thrown))
            .fold(None, |best: Option<&ExceptionHandler>, h| match best {
                Some(b) if !h.is_better_than(b) => Some(b),
                _ => Some(h),
            })
    }
}
