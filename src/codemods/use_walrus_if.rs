//! Fold `x = value` followed by `if x:` into `if x := value:`.
//!
//! Rule-based: the assignment only fires when an external finding for the
//! rule id covers it. A qualifying assignment is a bare name assigned on its
//! own line whose next statement is an `if` testing that same name, either
//! directly or as the left operand of a comparison. The assignment line is
//! deleted and the name in the condition becomes a walrus expression.
//!
//! Pending assignments stack LIFO so nested qualifying pairs resolve from
//! the inside out during the post-order walk.

use crate::edit::{Edit, EditSink};
use crate::engine::{Codemod, CodemodConfig, Detection, EngineError, ReviewGuidance, Transform, TraversalCtx};
use crate::lang::PyNode;
use std::ops::Range;

const NAME: &str = "use-walrus-if";
const SUMMARY: &str =
    "Replaces multiple expressions involving `if` operator with 'walrus' operator";
const DESCRIPTION: &str =
    "Replaces multiple expressions involving `if` operator with 'walrus' operator";

const RULE: &str = "
rules:
  - patterns:
      - pattern: |
          $ASSIGN
          if $COND:
              $BODY
      - metavariable-pattern:
          metavariable: $ASSIGN
          patterns:
            - pattern: $VAR = $RHS
      - focus-metavariable: $ASSIGN
";

pub fn codemod() -> Result<Codemod, EngineError> {
    Codemod::new(
        CodemodConfig {
            name: NAME.to_string(),
            summary: SUMMARY.to_string(),
            description: DESCRIPTION.to_string(),
            review_guidance: ReviewGuidance::MergeAfterCursoryReview,
            detection: Detection::Rule(RULE.to_string()),
        },
        Box::new(UseWalrusIf::default()),
    )
}

/// An assignment whose line has been deleted, waiting for its `if`.
///
/// `if_range` pins the exact sibling `if` identified by the validity gate,
/// so a same-name `if` nested inside its body cannot steal the binding.
struct PendingAssign {
    line: usize,
    target: String,
    value: String,
    if_range: Range<usize>,
}

#[derive(Default)]
struct UseWalrusIf {
    pending: Vec<PendingAssign>,
}

impl Transform for UseWalrusIf {
    fn begin(&mut self) {
        self.pending.clear();
    }

    fn visit(&mut self, node: &PyNode<'_>, ctx: &mut TraversalCtx<'_>, sink: &mut EditSink) {
        match &*node.kind() {
            "assignment" => self.visit_assignment(node, ctx, sink),
            "if_statement" => self.visit_if(node, ctx, sink),
            _ => {}
        }
    }
}

impl UseWalrusIf {
    fn visit_assignment(
        &mut self,
        node: &PyNode<'_>,
        ctx: &mut TraversalCtx<'_>,
        sink: &mut EditSink,
    ) {
        if !ctx.rule_selected(node) {
            return;
        }

        let Some(target) = node.field("left") else {
            return;
        };
        if target.kind() != "identifier" {
            return;
        }
        let Some(value) = node.field("right") else {
            return;
        };

        let Some(stmt) = node.parent() else {
            return;
        };
        if stmt.kind() != "expression_statement" {
            return;
        }
        let Some(next) = next_named_sibling(&stmt) else {
            return;
        };
        if next.kind() != "if_statement" {
            return;
        }

        let target_name = target.text().to_string();
        let Some(condition) = next.field("condition") else {
            return;
        };
        if !condition_tests(&condition, &target_name) {
            return;
        }

        // The statement must own its line; anything else on it vetoes the
        // removal.
        let span = ctx.span(&stmt);
        let Some(del_start) = ctx.index.line_start(span.start.line) else {
            return;
        };
        let del_end = ctx.index.line_end(span.end.line);
        let head = &ctx.source[del_start..span.bytes.start];
        let tail = &ctx.source[span.bytes.end..del_end];
        if !head.trim().is_empty() || !tail.trim().is_empty() {
            return;
        }

        let before = &ctx.source[del_start..del_end];
        if sink.try_push(Edit::delete(del_start, del_end, before)) {
            self.pending.push(PendingAssign {
                line: span.start.line,
                target: target_name,
                value: value.text().to_string(),
                if_range: next.range(),
            });
        }
    }

    fn visit_if(&mut self, node: &PyNode<'_>, ctx: &mut TraversalCtx<'_>, sink: &mut EditSink) {
        let Some(condition) = node.field("condition") else {
            return;
        };
        // Only the exact `if` pinned at arming time consumes the entry; any
        // other if, including same-name ones nested in its body, leaves the
        // stack alone.
        let matches_pending = self
            .pending
            .last()
            .is_some_and(|p| p.if_range == node.range());
        if !matches_pending {
            return;
        }
        let Some(pending) = self.pending.pop() else {
            return;
        };

        let walrus = format!("{} := {}", pending.target, pending.value);
        let (bytes, new_text) = if condition.kind() == "identifier" {
            (condition.range(), walrus)
        } else {
            // Comparison: only the left operand becomes the (parenthesized)
            // walrus expression.
            let Some(left) = condition.children().find(|c| c.is_named()) else {
                return;
            };
            (left.range(), format!("({walrus})"))
        };

        let before = &ctx.source[bytes.clone()];
        if sink.try_push(Edit::replace(bytes.start, bytes.end, before, new_text)) {
            ctx.record_change(pending.line);
        }
    }
}

/// True when the condition is the bare name `target` or a comparison whose
/// left operand is that name.
fn condition_tests(condition: &PyNode<'_>, target: &str) -> bool {
    match &*condition.kind() {
        "identifier" => condition.text() == target,
        "comparison_operator" => condition
            .children()
            .find(|c| c.is_named())
            .is_some_and(|left| left.kind() == "identifier" && left.text() == target),
        _ => false,
    }
}

fn next_named_sibling<'t>(node: &PyNode<'t>) -> Option<PyNode<'t>> {
    let parent = node.parent()?;
    let range = node.range();
    let mut found = false;
    for child in parent.children() {
        if found && child.is_named() {
            return Some(child);
        }
        if child.range() == range {
            found = true;
        }
    }
    None
}
