//! Codemod execution engine.
//!
//! A [`Codemod`] couples static metadata (name, summary, description, review
//! guidance) with a detection strategy and a [`Transform`]. The engine parses
//! a file once per codemod, walks the tree in post-order, lets the transform
//! propose byte-span edits through an [`EditSink`], applies them in one pass,
//! and re-parses the result. A rewrite that introduces new parse errors is
//! discarded along with its recorded changes.
//!
//! Detection comes in two flavors. Matcher-based codemods pre-screen the file
//! with an ast-grep pattern and confirm candidates structurally during the
//! walk. Rule-based codemods carry a normalized YAML rule and only fire on
//! nodes correlated with an externally loaded finding for that rule's id.

pub mod rule;

use crate::context::{ChangeRegistry, FileContext};
use crate::edit::{self, Edit, EditError, EditSink};
use crate::lang::{self, ParseError, PyNode};
use crate::pattern::PatternMatcher;
use crate::position::{LineIndex, SourceSpan};
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

pub use rule::{RuleError, RuleSpec};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid rule for codemod '{codemod}': {source}")]
    Rule {
        codemod: String,
        #[source]
        source: RuleError,
    },

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// How much human review a codemod's output warrants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewGuidance {
    MergeWithoutReview,
    MergeAfterCursoryReview,
    MergeAfterReview,
}

/// Detection strategy, as declared by a codemod definition.
#[derive(Debug, Clone)]
pub enum Detection {
    /// An ast-grep pattern pre-screening candidate nodes.
    Pattern(String),
    /// A YAML rule document; nodes fire only when correlated with a finding.
    Rule(String),
}

/// Detection after registration-time normalization.
#[derive(Debug, Clone)]
enum DetectionKind {
    Pattern(String),
    Rule(RuleSpec),
}

/// Static definition of a codemod, before registration.
#[derive(Debug, Clone)]
pub struct CodemodConfig {
    pub name: String,
    pub summary: String,
    pub description: String,
    pub review_guidance: ReviewGuidance,
    pub detection: Detection,
}

/// A registered codemod: validated metadata plus its transform.
pub struct Codemod {
    name: String,
    summary: String,
    description: String,
    review_guidance: ReviewGuidance,
    detection: DetectionKind,
    transform: Box<dyn Transform>,
}

impl Codemod {
    /// Register a codemod. Rule documents are normalized here, once, so
    /// per-file execution never re-parses YAML.
    pub fn new(config: CodemodConfig, transform: Box<dyn Transform>) -> Result<Self, EngineError> {
        let detection = match config.detection {
            Detection::Pattern(pattern) => DetectionKind::Pattern(pattern),
            Detection::Rule(yaml) => {
                let spec =
                    RuleSpec::normalize(&yaml, &config.name).map_err(|source| EngineError::Rule {
                        codemod: config.name.clone(),
                        source,
                    })?;
                DetectionKind::Rule(spec)
            }
        };

        Ok(Self {
            name: config.name,
            summary: config.summary,
            description: config.description,
            review_guidance: config.review_guidance,
            detection,
            transform,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn review_guidance(&self) -> ReviewGuidance {
        self.review_guidance
    }

    /// The rule id findings are correlated against, for rule-based codemods.
    pub fn rule_id(&self) -> Option<&str> {
        match &self.detection {
            DetectionKind::Rule(spec) => Some(spec.id()),
            DetectionKind::Pattern(_) => None,
        }
    }

    /// The normalized rule document, for rule-based codemods.
    pub fn rule_yaml(&self) -> Option<&str> {
        match &self.detection {
            DetectionKind::Rule(spec) => Some(spec.document()),
            DetectionKind::Pattern(_) => None,
        }
    }
}

impl std::fmt::Debug for Codemod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codemod")
            .field("name", &self.name)
            .field("detection", &self.detection)
            .finish_non_exhaustive()
    }
}

/// Node-visiting half of a codemod.
///
/// `visit` is called once per node, children before parents, and proposes
/// edits through the sink. Stateful transforms reset in `begin`, which runs
/// before each file's traversal.
pub trait Transform {
    fn begin(&mut self) {}

    fn visit(&mut self, node: &PyNode<'_>, ctx: &mut TraversalCtx<'_>, sink: &mut EditSink);
}

/// Per-traversal context handed to a transform at every node.
pub struct TraversalCtx<'a> {
    file: &'a mut FileContext,
    pub source: &'a str,
    pub index: &'a LineIndex,
    description: &'a str,
    rule_id: Option<&'a str>,
    pattern_spans: Option<Vec<Range<usize>>>,
}

impl TraversalCtx<'_> {
    pub fn span(&self, node: &PyNode<'_>) -> SourceSpan {
        self.index.span(node.range())
    }

    /// Whether the node passed the pattern pre-screen. Always true for
    /// rule-based codemods.
    pub fn pattern_hit(&self, node: &PyNode<'_>) -> bool {
        match &self.pattern_spans {
            None => true,
            Some(spans) => {
                let range = node.range();
                spans.iter().any(|s| *s == range)
            }
        }
    }

    /// Path and line filters, applied at the node's span.
    pub fn selected(&self, node: &PyNode<'_>) -> bool {
        self.file.is_selected(&self.span(node))
    }

    /// Filters plus finding correlation against the codemod's rule id.
    /// Pattern-based codemods never pass this; they use [`selected`].
    ///
    /// [`selected`]: TraversalCtx::selected
    pub fn rule_selected(&self, node: &PyNode<'_>) -> bool {
        let span = self.span(node);
        if !self.file.is_selected(&span) {
            return false;
        }
        match self.rule_id {
            Some(id) => self.file.finding_match(id, &span, &node.kind()),
            None => false,
        }
    }

    /// Record a change at `line` with the codemod's static description.
    pub fn record_change(&mut self, line: usize) {
        self.file.record_change(line, self.description);
    }
}

/// Run one codemod over one file's source.
///
/// Returns the rewritten source, or `None` when nothing fired or the rewrite
/// was discarded by the parse gate.
pub fn apply_codemod(
    codemod: &mut Codemod,
    source: &str,
    file: &mut FileContext,
) -> Result<Option<String>, EngineError> {
    let tree = lang::parse(source);
    let index = LineIndex::new(source);

    let pattern_spans = match &codemod.detection {
        DetectionKind::Pattern(pattern) => Some(PatternMatcher::new(source).match_spans(pattern)),
        DetectionKind::Rule(_) => None,
    };
    let rule_id = match &codemod.detection {
        DetectionKind::Rule(spec) => Some(spec.id()),
        DetectionKind::Pattern(_) => None,
    };

    let mark = file.changes().len();
    let mut sink = EditSink::new();

    {
        let mut ctx = TraversalCtx {
            file: &mut *file,
            source,
            index: &index,
            description: &codemod.description,
            rule_id,
            pattern_spans,
        };
        codemod.transform.begin();
        walk(tree.root(), codemod.transform.as_mut(), &mut ctx, &mut sink);
    }

    // Detection-only codemods record changes without proposing edits;
    // those changes stand even though the source is untouched.
    if sink.is_empty() {
        return Ok(None);
    }

    let rewritten = sink.apply(source)?;
    if lang::introduces_errors(source, &rewritten)? {
        tracing::debug!(
            codemod = %codemod.name,
            path = %file.path().display(),
            "rewrite introduced parse errors, discarding"
        );
        file.truncate_changes(mark);
        return Ok(None);
    }

    Ok(Some(rewritten))
}

fn walk<'t>(
    node: PyNode<'t>,
    transform: &mut dyn Transform,
    ctx: &mut TraversalCtx<'_>,
    sink: &mut EditSink,
) {
    let children: Vec<PyNode<'t>> = node.children().collect();
    for child in children {
        walk(child, transform, ctx, sink);
    }
    transform.visit(&node, ctx, sink);
}

/// Rewrite callback for [`RuleDriven`] codemods.
pub type RewriteFn = fn(&PyNode<'_>, &TraversalCtx<'_>) -> Option<String>;

/// Generic transform for rule-based codemods.
///
/// Fires on nodes of the listed kinds that pass filtering and finding
/// correlation. Every hit records a change; codemods that also rewrite the
/// node supply `rewrite`, and detection-only codemods leave it out.
pub struct RuleDriven {
    kinds: Vec<&'static str>,
    rewrite: Option<RewriteFn>,
}

impl RuleDriven {
    pub fn new(kinds: &[&'static str], rewrite: Option<RewriteFn>) -> Self {
        Self {
            kinds: kinds.to_vec(),
            rewrite,
        }
    }
}

impl Transform for RuleDriven {
    fn visit(&mut self, node: &PyNode<'_>, ctx: &mut TraversalCtx<'_>, sink: &mut EditSink) {
        if !self.kinds.iter().any(|k| node.kind() == *k) {
            return;
        }
        if !ctx.rule_selected(node) {
            return;
        }

        let span = ctx.span(node);
        match self.rewrite {
            // Detection-only: every correlated hit is a reportable change.
            None => ctx.record_change(span.start.line),
            // A declined rewrite or a sink-rejected edit stays invisible.
            Some(rewrite) => {
                if let Some(new_text) = rewrite(node, ctx) {
                    let before = &ctx.source[span.bytes.clone()];
                    if sink.try_push(Edit::replace(
                        span.bytes.start,
                        span.bytes.end,
                        before,
                        new_text,
                    )) {
                        ctx.record_change(span.start.line);
                    }
                }
            }
        }
    }
}

/// Outcome of processing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Unchanged,
    Rewritten { dry_run: bool },
}

/// An ordered set of codemods run over files, accumulating a change registry.
///
/// Codemods run sequentially; each one sees the cumulative output of those
/// before it and re-parses it fresh.
pub struct Session {
    codemods: Vec<Codemod>,
    registry: ChangeRegistry,
}

impl Session {
    pub fn new(codemods: Vec<Codemod>) -> Self {
        Self {
            codemods,
            registry: ChangeRegistry::default(),
        }
    }

    pub fn registry(&self) -> &ChangeRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> ChangeRegistry {
        self.registry
    }

    /// Run every codemod over `source`, returning the rewritten text when
    /// any of them changed it.
    pub fn process_source(
        &mut self,
        file: &mut FileContext,
        source: &str,
    ) -> Result<Option<String>, EngineError> {
        let mut current = source.to_string();
        let mut rewritten = false;

        for codemod in &mut self.codemods {
            if let Some(next) = apply_codemod(codemod, &current, file)? {
                current = next;
                rewritten = true;
            }
            let changes = file.take_changes();
            if !changes.is_empty() {
                self.registry.record(file.path(), &codemod.name, changes);
            }
        }

        Ok(rewritten.then_some(current))
    }

    /// Read, transform, and (outside dry-run) atomically rewrite one file.
    pub fn process_file(&mut self, file: &mut FileContext) -> Result<FileOutcome, EngineError> {
        let path = file.path().to_path_buf();
        let source = std::fs::read_to_string(&path).map_err(|source| EngineError::Io {
            path: path.clone(),
            source,
        })?;

        match self.process_source(file, &source)? {
            None => Ok(FileOutcome::Unchanged),
            Some(rewritten) => {
                let dry_run = file.is_dry_run();
                if dry_run {
                    tracing::info!(path = %path.display(), "dry run, skipping write");
                } else {
                    edit::write_file(&path, &rewritten)?;
                }
                Ok(FileOutcome::Rewritten { dry_run })
            }
        }
    }
}
