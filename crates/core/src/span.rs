//! Source spans for tokens and reduced constructs.

use serde::{Deserialize, Serialize};

/// A line/column range in the source, all positions 1-based.
///
/// `last_column` is inclusive: a one-character token at column 5 spans
/// `5..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub first_line: u32,
    pub first_column: u32,
    pub last_line: u32,
    pub last_column: u32,
}

impl Span {
    pub fn new(first_line: u32, first_column: u32, last_line: u32, last_column: u32) -> Self {
        Span {
            first_line,
            first_column,
            last_line,
            last_column,
        }
    }

    /// A zero-width span at one position.
    pub fn point(line: u32, column: u32) -> Self {
        Span::new(line, column, line, column)
    }

    /// The location held by the bottom stack slot before any token is read.
    pub fn start() -> Self {
        Span::point(1, 1)
    }

    /// Span of a reduced symbol: from the start of its first child to the
    /// end of its last child.
    pub fn cover(first: &Span, last: &Span) -> Self {
        Span::new(
            first.first_line,
            first.first_column,
            last.last_line,
            last.last_column,
        )
    }

    /// The zero-width point at the end of this span. Empty productions take
    /// this location from the symbol preceding them.
    pub fn end_point(&self) -> Self {
        Span::point(self.last_line, self.last_column)
    }

    pub fn is_empty(&self) -> bool {
        self.first_line == self.last_line && self.first_column == self.last_column
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_takes_start_of_first_and_end_of_last() {
        let a = Span::new(2, 1, 2, 10);
        let b = Span::new(3, 3, 4, 7);
        assert_eq!(Span::cover(&a, &b), Span::new(2, 1, 4, 7));
    }

    #[test]
    fn end_point_collapses_to_last_position() {
        let s = Span::new(1, 4, 2, 9);
        let p = s.end_point();
        assert_eq!(p, Span::point(2, 9));
        assert!(p.is_empty());
        assert!(!s.is_empty());
    }
}
