//! Source location tracking for expression text
//!
//! Positions carry a byte offset alongside 1-based line/column so that
//! lexical and syntactic errors can be rendered with a caret under the
//! offending character.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in expression text with byte offset, line, and column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Byte offset from start of input (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// The starting position (offset 0, line 1, column 1)
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open span of expression text: `[start, end)` in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "span start must not be after end"
        );
        Self { start, end }
    }

    /// Combine this span with another into one covering both.
    pub fn to(self, other: Span) -> Span {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }

    /// Byte length of the spanned text.
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Check that this span fully covers another span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    /// Slice the spanned text out of the original input.
    pub fn slice<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start.offset..self.end.offset]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_to_covers_both() {
        let a = Span::new(Position::new(2, 1, 3), Position::new(5, 1, 6));
        let b = Span::new(Position::new(8, 1, 9), Position::new(12, 1, 13));
        let merged = a.to(b);
        assert_eq!(merged.start.offset, 2);
        assert_eq!(merged.end.offset, 12);
        assert!(merged.contains(&a));
        assert!(merged.contains(&b));
    }

    #[test]
    fn span_slice_returns_source_text() {
        let input = "name.given";
        let span = Span::new(Position::new(5, 1, 6), Position::new(10, 1, 11));
        assert_eq!(span.slice(input), "given");
        assert_eq!(span.len(), 5);
    }

    #[test]
    fn display_renders_line_and_column() {
        let span = Span::new(Position::new(0, 1, 1), Position::new(4, 1, 5));
        assert_eq!(format!("{}", span), "1:1-5");
    }
}
