use std::ops::Range;

use serde::Serialize;

/// Byte-offset span into a document's text. Start is inclusive, end is exclusive.
///
/// Nodes, operator tokens and declaration names all carry a `Span`. Spans of a
/// freshly built tree are empty until the canonical text has been rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// Span of `len` bytes starting at `start`.
    pub fn at(start: u32, len: u32) -> Self {
        Self::new(start, start + len)
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` lies inside the span. The end offset counts as inside
    /// so that a cursor placed right after an identifier still hits it.
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The span as a `usize` range, the shape report renderers expect.
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Pre-computed line start positions for on-demand line/column lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based (line, column) pair.
    ///
    /// Column is measured in bytes from the start of the line.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset);
        let line_idx = line_idx.saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Byte offset where the given 0-based line starts, if the line exists.
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize).copied()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_at_and_len() {
        let span = Span::at(4, 3);
        assert_eq!(span, Span::new(4, 7));
        assert_eq!(span.len(), 3);
        assert!(!span.is_empty());
        assert!(Span::default().is_empty());
    }

    #[test]
    fn span_contains_is_end_inclusive() {
        let span = Span::new(2, 5);
        assert!(!span.contains(1));
        assert!(span.contains(2));
        assert!(span.contains(5));
        assert!(!span.contains(6));
    }

    #[test]
    fn span_merge_and_range() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
        assert_eq!(merged.range(), 5..15);
    }

    #[test]
    fn line_index_lookup() {
        let idx = LineIndex::new("var x = 1;\nvar y = 2;");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(4), (1, 5));
        assert_eq!(idx.line_col(11), (2, 1));
        assert_eq!(idx.line_col(15), (2, 5));
        assert_eq!(idx.line_count(), 2);
        assert_eq!(idx.line_start(1), Some(11));
        assert_eq!(idx.line_start(2), None);
    }
}
