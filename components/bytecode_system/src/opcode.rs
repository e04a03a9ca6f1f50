//! Operand types carried by instructions
//!
//! Branch offsets are relative: a branch at index `i` with offset `d`
//! continues at `i + d`.

use core_types::NativeEntry;
use std::collections::HashMap;

/// Index of a local slot in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Slot as an array index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Operands of a non-local jump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoTarget {
    /// Relative offset to the label
    pub offset: i32,
    /// Evaluation stack depth at the label, including a carried value
    pub target_depth: usize,
    /// Whether the jump delivers a value to the label
    pub carries_value: bool,
    /// Whether the goto stands in an expression position that expects a
    /// result (it never actually produces one)
    pub has_result: bool,
    /// Start-of-finally index this exit was routed through, once rewritten
    pub via_finally: Option<usize>,
}

impl GotoTarget {
    /// Unresolved goto operands
    pub fn new(carries_value: bool, has_result: bool) -> Self {
        Self {
            offset: 0,
            target_depth: 0,
            carries_value,
            has_result,
            via_finally: None,
        }
    }
}

/// Jump table of a multi-way switch.
///
/// An unmatched or non-integer selector continues at `default_offset`,
/// which is always the instruction right after the switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTable {
    /// Relative offsets keyed by case value
    pub cases: HashMap<i64, i32>,
    /// Relative offset taken when nothing matches
    pub default_offset: i32,
}

impl SwitchTable {
    /// Table whose cases are still unresolved
    pub fn new() -> Self {
        Self {
            cases: HashMap::new(),
            default_offset: 1,
        }
    }

    /// Offset selected by `key`
    pub fn offset_for(&self, key: Option<i64>) -> i32 {
        key.and_then(|k| self.cases.get(&k).copied())
            .unwrap_or(self.default_offset)
    }
}

impl Default for SwitchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A resolved native call site.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Function being called
    pub entry: NativeEntry,
}

impl CallSite {
    /// Number of operands popped
    pub fn argc(&self) -> usize {
        self.entry.arity
    }

    /// Whether the call pushes a result
    pub fn returns_value(&self) -> bool {
        self.entry.returns_value
    }
}
