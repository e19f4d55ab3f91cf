//! Structural pattern matching over Python source.
//!
//! Wraps ast-grep's metavariable syntax (`$NAME`, `$$$BODY`, `$_`) for
//! locating candidate rewrite sites. Matcher-based codemods use this to
//! pre-screen a file before node-by-node detection logic runs.

use crate::lang::{python, PyDoc, PyTree};
use ast_grep_core::{AstGrep, NodeMatch, Pattern};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Compiled patterns are cached per thread; compilation dominates match
    // time for short sources. Evicted wholesale when the cap is reached.
    static PATTERN_CACHE: RefCell<HashMap<String, Pattern>> = RefCell::new(HashMap::new());
}

fn compiled(pattern_str: &str) -> Pattern {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(p) = cache.get(pattern_str) {
            return p.clone();
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let pattern = Pattern::new(pattern_str, python());
        cache.insert(pattern_str.to_string(), pattern.clone());
        pattern
    })
}

/// Number of compiled patterns currently cached on this thread.
pub fn cached_pattern_count() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}

/// A match from an ast-grep pattern with captured metavariables.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Byte range of the entire match
    pub byte_start: usize,
    pub byte_end: usize,
    /// The matched text
    pub text: String,
    /// Captured metavariables: name -> text
    pub captures: HashMap<String, String>,
}

/// Pattern matcher over one Python source file.
pub struct PatternMatcher {
    source: String,
    tree: PyTree,
}

impl PatternMatcher {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            tree: AstGrep::new(source, python()),
        }
    }

    /// Find all matches for a pattern, in tree order.
    pub fn find_all(&self, pattern: &str) -> Vec<PatternMatch> {
        let pat = compiled(pattern);
        self.tree
            .root()
            .find_all(&pat)
            .map(|m| self.to_pattern_match(m))
            .collect()
    }

    /// Byte spans of all matches for a pattern.
    pub fn match_spans(&self, pattern: &str) -> Vec<Range<usize>> {
        let pat = compiled(pattern);
        self.tree
            .root()
            .find_all(&pat)
            .map(|m| m.get_node().range())
            .collect()
    }

    /// Check if a pattern has any matches.
    pub fn has_match(&self, pattern: &str) -> bool {
        let pat = compiled(pattern);
        self.tree.root().find(&pat).is_some()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn to_pattern_match(&self, m: NodeMatch<PyDoc>) -> PatternMatch {
        let range = m.get_node().range();
        let text = self.source[range.start..range.end].to_string();

        let env = m.get_env().clone();
        let captures: HashMap<String, String> = env.into();

        PatternMatch {
            byte_start: range.start,
            byte_end: range.end,
            text,
            captures,
        }
    }
}
