//! Compile-time branch targets

/// Handle of a label inside an [`InstructionList`](crate::InstructionList)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub(crate) usize);

impl LabelId {
    /// Raw index, for diagnostics
    pub fn index(self) -> usize {
        self.0
    }
}

/// A branch operand waiting for its label to be marked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fixup {
    pub instruction: usize,
    pub case: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Label {
    /// Instruction index, once marked
    pub index: Option<usize>,
    /// Stack depth every path must agree on; the first writer wins
    pub depth: Option<usize>,
    pub pending: Vec<Fixup>,
}

impl Label {
    pub fn is_marked(&self) -> bool {
        self.index.is_some()
    }
}
