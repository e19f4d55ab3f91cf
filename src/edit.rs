//! Byte-span edit primitives over in-memory source.
//!
//! Every codemod rewrite compiles down to a single primitive: [`Edit`], a
//! verified byte-span replacement against the original source text.
//! Intelligence lives in span acquisition (tree traversal, pattern matching,
//! finding correlation), not in the application logic.
//!
//! Edits for one traversal are collected through an [`EditSink`], which
//! rejects overlapping spans (first accepted wins) so that nested rewrite
//! sites never corrupt each other. Accepted edits are applied in a single
//! pass over the original source.

use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// A verified byte-span replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until handed to an EditSink"]
pub struct Edit {
    /// Starting byte offset (inclusive), into the original source
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in source of length {source_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        source_len: usize,
    },

    #[error("overlapping edits: [{}, {}) and [{}, {})", .first.0, .first.1, .second.0, .second.1)]
    OverlappingEdits {
        first: (usize, usize),
        second: (usize, usize),
    },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Edit {
    /// Create an edit replacing `byte_start..byte_end` with `new_text`,
    /// verified against the text currently occupying that span.
    pub fn replace(
        byte_start: usize,
        byte_end: usize,
        expected_before: &str,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Create a deletion edit for `byte_start..byte_end`.
    pub fn delete(byte_start: usize, byte_end: usize, expected_before: &str) -> Self {
        Self::replace(byte_start, byte_end, expected_before, String::new())
    }

    pub fn overlaps(&self, other: &Edit) -> bool {
        self.byte_start < other.byte_end && other.byte_start < self.byte_end
    }

    /// Validate the edit against the source it will be applied to.
    ///
    /// Returns the current text at [byte_start, byte_end) on success.
    fn validate<'a>(&self, source: &'a str) -> Result<&'a str, EditError> {
        let bad_range = || EditError::InvalidByteRange {
            byte_start: self.byte_start,
            byte_end: self.byte_end,
            source_len: source.len(),
        };

        if self.byte_start > self.byte_end || self.byte_end > source.len() {
            return Err(bad_range());
        }
        if !source.is_char_boundary(self.byte_start) || !source.is_char_boundary(self.byte_end) {
            return Err(bad_range());
        }

        let current = &source[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }

        Ok(current)
    }
}

/// Collects the edits proposed during one traversal pass.
///
/// An edit whose span overlaps an already-accepted edit is rejected; since
/// traversal visits children before parents, this keeps the innermost
/// rewrite and drops any enclosing rewrite computed from stale child text.
#[derive(Debug, Default)]
pub struct EditSink {
    edits: Vec<Edit>,
}

impl EditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the edit unless it overlaps one already accepted.
    pub fn try_push(&mut self, edit: Edit) -> bool {
        if let Some(existing) = self.edits.iter().find(|e| e.overlaps(&edit)) {
            tracing::debug!(
                rejected = ?(edit.byte_start, edit.byte_end),
                accepted = ?(existing.byte_start, existing.byte_end),
                "dropping edit overlapping an accepted rewrite"
            );
            return false;
        }
        self.edits.push(edit);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply all accepted edits to `source`, producing the rewritten text.
    ///
    /// All spans address the original source; edits are validated first and
    /// spliced in ascending span order.
    pub fn apply(&self, source: &str) -> Result<String, EditError> {
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by_key(|e| (e.byte_start, e.byte_end));

        for window in ordered.windows(2) {
            let (a, b) = (window[0], window[1]);
            if a.byte_end > b.byte_start {
                return Err(EditError::OverlappingEdits {
                    first: (a.byte_start, a.byte_end),
                    second: (b.byte_start, b.byte_end),
                });
            }
        }

        for edit in &ordered {
            edit.validate(source)?;
        }

        let extra: usize = ordered.iter().map(|e| e.new_text.len()).sum();
        let mut output = String::with_capacity(source.len() + extra);
        let mut cursor = 0;
        for edit in &ordered {
            output.push_str(&source[cursor..edit.byte_start]);
            output.push_str(&edit.new_text);
            cursor = edit.byte_end;
        }
        output.push_str(&source[cursor..]);

        Ok(output)
    }
}

/// Atomically replace `path` with `content`: tempfile + fsync + rename.
///
/// Either the full write succeeds or the file is left untouched. The mtime
/// is bumped afterwards so downstream incremental tooling notices the change.
pub fn write_file(path: &Path, content: &str) -> Result<(), EditError> {
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn verification_exact_match() {
        let verify = EditVerification::ExactMatch("hello world".to_string());
        assert!(verify.matches("hello world"));
        assert!(!verify.matches("hello"));
    }

    #[test]
    fn verification_hash() {
        let verify = EditVerification::Hash(xxh3_64(b"hello world"));
        assert!(verify.matches("hello world"));
        assert!(!verify.matches("goodbye world"));
    }

    #[test]
    fn verification_from_text_picks_strategy() {
        assert!(matches!(
            EditVerification::from_text("small"),
            EditVerification::ExactMatch(_)
        ));
        assert!(matches!(
            EditVerification::from_text(&"x".repeat(2000)),
            EditVerification::Hash(_)
        ));
    }

    #[test]
    fn apply_single_edit() {
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::replace(0, 5, "hello", "howdy")));
        assert_eq!(sink.apply("hello world").unwrap(), "howdy world");
    }

    #[test]
    fn apply_multiple_edits_in_any_push_order() {
        let source = "line1\nline2\nline3\n";
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::replace(12, 17, "line3", "LINE3")));
        assert!(sink.try_push(Edit::replace(0, 5, "line1", "LINE1")));
        assert_eq!(sink.apply(source).unwrap(), "LINE1\nline2\nLINE3\n");
    }

    #[test]
    fn deletion_edit() {
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::delete(0, 6, "x = 1\n")));
        assert_eq!(sink.apply("x = 1\nif x:\n").unwrap(), "if x:\n");
    }

    #[test]
    fn overlapping_edit_rejected_first_wins() {
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::replace(2, 8, "cdefgh", "INNER!")));
        assert!(!sink.try_push(Edit::replace(0, 10, "abcdefghij", "OUTER")));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.apply("abcdefghij").unwrap(), "abINNER!ij");
    }

    #[test]
    fn adjacent_edits_do_not_overlap() {
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::replace(0, 3, "abc", "A")));
        assert!(sink.try_push(Edit::replace(3, 6, "def", "B")));
        assert_eq!(sink.apply("abcdef").unwrap(), "AB");
    }

    #[test]
    fn invalid_range_detected() {
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::replace(5, 20, "", "x")));
        assert!(matches!(
            sink.apply("hello"),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn mismatched_before_text_detected() {
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::replace(0, 5, "howdy", "x")));
        assert!(matches!(
            sink.apply("hello world"),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn non_char_boundary_rejected() {
        let mut sink = EditSink::new();
        assert!(sink.try_push(Edit::replace(0, 1, "", "x")));
        assert!(matches!(
            sink.apply("é"),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn write_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.py");
        std::fs::write(&path, "original").unwrap();

        write_file(&path, "rewritten").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "rewritten");
    }

    proptest! {
        /// Disjoint replacements applied through the sink match a manual
        /// left-to-right splice of the same replacements.
        #[test]
        fn disjoint_edits_match_manual_splice(
            source in "[a-z]{20,60}",
            cut1 in 0usize..10,
            cut2 in 10usize..20,
            repl1 in "[A-Z]{0,5}",
            repl2 in "[A-Z]{0,5}",
        ) {
            let mid = 10usize;
            let mut sink = EditSink::new();
            prop_assert!(sink.try_push(Edit::replace(cut1, mid, &source[cut1..mid], repl1.clone())));
            prop_assert!(sink.try_push(Edit::replace(mid, cut2, &source[mid..cut2], repl2.clone())));

            let expected = format!(
                "{}{}{}{}",
                &source[..cut1],
                repl1,
                repl2,
                &source[cut2..]
            );
            prop_assert_eq!(sink.apply(&source).unwrap(), expected);
        }
    }
}
