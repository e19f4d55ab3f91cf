//! Normalized findings from external static-analysis tools.
//!
//! An analysis tool reports issues and hotspots as JSON records carrying a
//! rule identifier and a line/column text range in its own coordinate
//! system. This module normalizes those records into [`Finding`] values,
//! groups them by rule into a [`FindingSet`], and answers the one question
//! the engine asks: does a finding for this rule contain this tree node?
//!
//! # Coordinates
//!
//! Finding lines are 1-indexed and offsets are 0-indexed, which matches the
//! crate's native convention (see `position`). Some tools report ranges
//! that exclude a node's enclosing delimiters; containment therefore widens
//! the finding window per node kind before testing (tuple literals get one
//! extra column on each side).
//!
//! # Failure policy
//!
//! Loading a findings file is a best-effort boundary: any parse or schema
//! failure yields an empty set for that file and a debug log, never an
//! aborted run. Within a well-formed file, a record without a rule
//! identifier fails construction of the whole file's set (surfaced through
//! the same boundary), while a record without a text range is skipped on
//! its own.

use crate::position::{LineCol, SourceSpan};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindingsError {
    #[error("finding record has no rule identifier")]
    MissingRuleId,

    #[error("failed to read findings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse findings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One reported range within a file, in this crate's coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub start: LineCol,
    pub end: LineCol,
}

impl Location {
    /// True when this location's window, widened by `widen` columns on each
    /// side, contains the node span.
    fn contains(&self, span: &SourceSpan, widen: usize) -> bool {
        let starts_before = self.start.line < span.start.line
            || (self.start.line == span.start.line
                && self.start.column.saturating_sub(widen) <= span.start.column);
        let ends_after = span.end.line < self.end.line
            || (span.end.line == self.end.line && span.end.column <= self.end.column + widen);
        starts_before && ends_after
    }
}

/// A normalized finding: one rule identifier with its reported locations.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    rule_id: String,
    locations: Vec<Location>,
}

impl Finding {
    pub fn new(rule_id: impl Into<String>, locations: Vec<Location>) -> Self {
        Self {
            rule_id: rule_id.into(),
            locations,
        }
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Containment test against a node span, applying the per-kind column
    /// adjustment before comparing.
    pub fn matches(&self, file: &Path, span: &SourceSpan, node_kind: &str) -> bool {
        let widen = column_adjustment(node_kind);
        self.locations
            .iter()
            .any(|loc| loc.file == file && loc.contains(span, widen))
    }
}

/// Per-node-kind widening of the finding window, in columns.
///
/// Tuple ranges from the analysis tool exclude the parentheses, while the
/// tree's tuple node includes them.
fn column_adjustment(node_kind: &str) -> usize {
    match node_kind {
        "tuple" => 1,
        _ => 0,
    }
}

/// All retained findings of one findings file, grouped by rule identifier.
#[derive(Debug, Default)]
pub struct FindingSet {
    by_rule: HashMap<String, Vec<Finding>>,
}

impl FindingSet {
    pub fn add(&mut self, finding: Finding) {
        self.by_rule
            .entry(finding.rule_id.clone())
            .or_default()
            .push(finding);
    }

    pub fn for_rule(&self, rule_id: &str) -> &[Finding] {
        self.by_rule.get(rule_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_rule.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_rule.values().map(Vec::len).sum()
    }

    /// True when any retained finding for `rule_id` contains the node span.
    pub fn matches(&self, rule_id: &str, file: &Path, span: &SourceSpan, node_kind: &str) -> bool {
        self.for_rule(rule_id)
            .iter()
            .any(|f| f.matches(file, span, node_kind))
    }

    /// Parse a findings JSON document.
    ///
    /// Only records whose status is `open` or `to_review` (case-insensitive)
    /// are retained; everything else is dropped silently.
    pub fn from_json_str(data: &str) -> Result<Self, FindingsError> {
        let doc: FindingsDoc = serde_json::from_str(data)?;

        let mut set = FindingSet::default();
        for record in doc.issues.iter().chain(doc.hotspots.iter()) {
            let open = record
                .status
                .as_deref()
                .is_some_and(|s| matches!(s.to_lowercase().as_str(), "open" | "to_review"));
            if !open {
                continue;
            }

            let rule_id = record
                .rule
                .as_deref()
                .or(record.rule_key.as_deref())
                .ok_or(FindingsError::MissingRuleId)?;

            // A record without a text range is unusable on its own but does
            // not invalidate the rest of the file.
            let Some(range) = &record.text_range else {
                tracing::debug!(rule = rule_id, "skipping finding without a text range");
                continue;
            };

            // The component is "<project-key>:<path>".
            let file = record
                .component
                .as_deref()
                .map(|c| c.rsplit(':').next().unwrap_or(c))
                .unwrap_or_default();

            set.add(Finding::new(
                rule_id,
                vec![Location {
                    file: PathBuf::from(file),
                    start: LineCol::new(range.start_line, range.start_offset),
                    end: LineCol::new(range.end_line, range.end_offset),
                }],
            ));
        }

        Ok(set)
    }

    /// Load a findings file, degrading to an empty set on any failure.
    pub fn from_file(path: &Path) -> Self {
        let load = || -> Result<Self, FindingsError> {
            let data = std::fs::read_to_string(path).map_err(|source| FindingsError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_json_str(&data)
        };

        match load() {
            Ok(set) => set,
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "could not parse findings file");
                FindingSet::default()
            }
        }
    }

    /// Load a findings file through the process-wide cache.
    ///
    /// The cache is keyed by canonical path and constructed single-flight:
    /// the first load of a path builds the set while holding the cache lock,
    /// so concurrent first loads observe the same instance.
    pub fn load_cached(path: &Path) -> Arc<FindingSet> {
        static CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<FindingSet>>>> = OnceLock::new();

        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
        let mut map = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(set) = map.get(&key) {
            return Arc::clone(set);
        }

        let set = Arc::new(Self::from_file(path));
        map.insert(key, Arc::clone(&set));
        set
    }
}

#[derive(Debug, Deserialize)]
struct FindingsDoc {
    #[serde(default)]
    issues: Vec<RawFinding>,
    #[serde(default)]
    hotspots: Vec<RawFinding>,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    // Issues use `rule`, hotspots use `ruleKey`.
    rule: Option<String>,
    #[serde(rename = "ruleKey")]
    rule_key: Option<String>,
    status: Option<String>,
    #[serde(rename = "textRange")]
    text_range: Option<RawTextRange>,
    component: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTextRange {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startOffset")]
    start_offset: usize,
    #[serde(rename = "endLine")]
    end_line: usize,
    #[serde(rename = "endOffset")]
    end_offset: usize,
}
