//! Source positions carried through debug info into runtime traces.

use std::fmt;

/// Represents a position in source code.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition {
///     line: 10,
///     column: 5,
///     offset: 150,
/// };
///
/// assert_eq!(pos.line, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Byte offset from the start of the source file
    pub offset: usize,
}

/// A half-open source range attached to a stretch of instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    /// First position covered
    pub start: SourcePosition,
    /// Position just past the covered range
    pub end: SourcePosition,
}

impl SourceSpan {
    /// Span covering a range of lines, columns starting at 1
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start: SourcePosition {
                line: start_line,
                column: 1,
                offset: 0,
            },
            end: SourcePosition {
                line: end_line,
                column: 1,
                offset: 0,
            },
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}
