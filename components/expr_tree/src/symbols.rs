//! Variables and label targets

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static NEXT_SYMBOL: AtomicU32 = AtomicU32::new(1);

fn next_id() -> u32 {
    NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed)
}

/// A variable declared by a block, a lambda parameter list or a catch
/// clause.
///
/// Equality and hashing use the identity handed out by [`Variable::new`];
/// the name is for diagnostics only.
#[derive(Clone)]
pub struct Variable {
    id: u32,
    name: Arc<str>,
}

impl Variable {
    /// Create a fresh variable
    pub fn new(name: &str) -> Self {
        Self {
            id: next_id(),
            name: Arc::from(name),
        }
    }

    /// Identity of the variable
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// The target of gotos, loop exits and labeled positions.
///
/// A target that carries a value receives one from every goto jumping to
/// it, and its label node yields that value.
#[derive(Clone)]
pub struct LabelTarget {
    id: u32,
    name: Arc<str>,
    carries_value: bool,
}

impl LabelTarget {
    /// Create a target that carries no value
    pub fn new(name: &str) -> Self {
        Self {
            id: next_id(),
            name: Arc::from(name),
            carries_value: false,
        }
    }

    /// Create a target that carries a value
    pub fn with_value(name: &str) -> Self {
        Self {
            carries_value: true,
            ..Self::new(name)
        }
    }

    /// Identity of the target
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether jumps to this target carry a value
    pub fn carries_value(&self) -> bool {
        self.carries_value
    }
}

impl PartialEq for LabelTarget {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LabelTarget {}

impl Hash for LabelTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for LabelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.id)
    }
}
