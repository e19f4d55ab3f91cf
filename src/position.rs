//! Line/column bookkeeping for byte-span edits.
//!
//! All positions in this crate are derived from byte offsets into the
//! original source. Lines are 1-indexed, columns are 0-indexed byte
//! offsets within the line. External tools that report other conventions
//! are normalized at their ingestion boundary.

use std::ops::Range;

/// A 1-indexed line paired with a 0-indexed byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

impl LineCol {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A byte range with its resolved start/end line-column coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub bytes: Range<usize>,
    pub start: LineCol,
    pub end: LineCol,
}

/// Byte-offset to line/column mapping, built once per source file.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// Resolve a byte offset to a line/column pair.
    ///
    /// Offsets past the end of the source clamp to the final position.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        LineCol::new(line_idx + 1, offset - self.line_starts[line_idx])
    }

    /// Byte offset of the first character of a 1-indexed line.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        self.line_starts.get(line - 1).copied()
    }

    /// Byte offset just past the end of a 1-indexed line, including its
    /// newline. The last line ends at the end of the source.
    pub fn line_end(&self, line: usize) -> usize {
        self.line_starts.get(line).copied().unwrap_or(self.len)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn span(&self, bytes: Range<usize>) -> SourceSpan {
        SourceSpan {
            start: self.line_col(bytes.start),
            end: self.line_col(bytes.end),
            bytes,
        }
    }
}
