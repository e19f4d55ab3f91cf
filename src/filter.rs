//! Per-file filtering pipeline.
//!
//! Two independent filters gate every rewrite site: a path filter over UNIX
//! glob patterns and a line filter over inclusive line ranges. Both use the
//! same include/exclude policy: when an include list is present the subject
//! must match at least one entry, and when an exclude list is present it
//! must match none.

use glob::{Pattern, PatternError};
use std::path::Path;

/// Path-level include/exclude globs.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    /// Compile glob pattern lists. An empty list imposes no constraint.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, PatternError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn allows(&self, path: &Path) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| p.matches_path(path));
        let excluded = self.exclude.iter().any(|p| p.matches_path(path));
        included && !excluded
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, PatternError> {
    patterns.iter().map(|p| Pattern::new(p.as_ref())).collect()
}

/// An inclusive range of 1-indexed line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(line: usize) -> Self {
        Self::new(line, line)
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

/// Line-level include/exclude ranges, same policy as [`PathFilter`].
#[derive(Debug, Clone, Default)]
pub struct LineFilter {
    include: Vec<LineRange>,
    exclude: Vec<LineRange>,
}

impl LineFilter {
    pub fn new(include: Vec<LineRange>, exclude: Vec<LineRange>) -> Self {
        Self { include, exclude }
    }

    pub fn allows(&self, line: usize) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|r| r.contains(line));
        let excluded = self.exclude.iter().any(|r| r.contains(line));
        included && !excluded
    }
}
