//! Per-file transformation session state and change records.

use crate::filter::{LineFilter, PathFilter};
use crate::findings::FindingSet;
use crate::position::SourceSpan;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One recorded rewrite: the line it happened on and the codemod's static
/// description. Serializes as `{"lineNumber": "12", "description": ...}`,
/// matching the report contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    #[serde(rename = "lineNumber", serialize_with = "line_as_string")]
    pub line_number: usize,
    pub description: String,
}

fn line_as_string<S: Serializer>(line: &usize, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(line)
}

/// Mutable session state for transforming one file in one run.
///
/// Owned exclusively by that file's transformation and discarded when its
/// codemods finish; nothing here is shared across files.
#[derive(Debug)]
pub struct FileContext {
    path: PathBuf,
    findings: Arc<FindingSet>,
    path_filter: PathFilter,
    line_filter: LineFilter,
    dry_run: bool,
    changes: Vec<Change>,
}

impl FileContext {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            findings: Arc::new(FindingSet::default()),
            path_filter: PathFilter::default(),
            line_filter: LineFilter::default(),
            dry_run: false,
            changes: Vec::new(),
        }
    }

    pub fn with_findings(mut self, findings: Arc<FindingSet>) -> Self {
        self.findings = findings;
        self
    }

    pub fn with_path_filter(mut self, filter: PathFilter) -> Self {
        self.path_filter = filter;
        self
    }

    pub fn with_line_filter(mut self, filter: LineFilter) -> Self {
        self.line_filter = filter;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Filtering pipeline: both the path filter and the line filter must
    /// pass. Evaluated fresh at every node visit.
    pub fn is_selected(&self, span: &SourceSpan) -> bool {
        self.path_filter.allows(&self.path) && self.line_filter.allows(span.start.line)
    }

    /// Rule-based selection: filtering plus a finding correlation for the
    /// codemod's rule id.
    pub fn finding_match(&self, rule_id: &str, span: &SourceSpan, node_kind: &str) -> bool {
        self.findings.matches(rule_id, &self.path, span, node_kind)
    }

    pub fn record_change(&mut self, line_number: usize, description: &str) {
        self.changes.push(Change {
            line_number,
            description: description.to_string(),
        });
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Drop changes recorded past `len`; used to roll back a discarded
    /// traversal.
    pub fn truncate_changes(&mut self, len: usize) {
        self.changes.truncate(len);
    }

    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }
}

/// Run-scoped record of every changeset produced by a session.
///
/// Owned by the orchestrating run and passed by reference into each file's
/// processing; codemods themselves hold no cross-file state.
#[derive(Debug, Default, Serialize)]
pub struct ChangeRegistry {
    entries: Vec<ChangeSet>,
}

/// The changes one codemod made to one file.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSet {
    pub path: PathBuf,
    pub codemod: String,
    pub changes: Vec<Change>,
}

impl ChangeRegistry {
    pub fn record(&mut self, path: &Path, codemod: &str, changes: Vec<Change>) {
        self.entries.push(ChangeSet {
            path: path.to_path_buf(),
            codemod: codemod.to_string(),
            changes,
        });
    }

    pub fn entries(&self) -> &[ChangeSet] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths with at least one recorded change, in first-change order.
    pub fn changed_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = Vec::new();
        for entry in &self.entries {
            if !entry.changes.is_empty() && !files.contains(&entry.path.as_path()) {
                files.push(&entry.path);
            }
        }
        files
    }
}
