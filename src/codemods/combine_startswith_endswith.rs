//! Merge `x.startswith(a) or x.startswith(b)` into a single tuple call.
//!
//! Both `startswith` and `endswith` accept a tuple of prefixes, so an
//! or-chain of calls on the same receiver with the same method collapses
//! into one call. Three shapes are handled, in priority order: two bare
//! calls, a call followed by a chain whose first operand is a mergeable
//! call, and a chain whose last operand pairs with a trailing call.
//!
//! Merged tuple elements are deduplicated by evaluated string value.
//! Elements without a static value (names, f-strings) are always kept.

use crate::edit::{Edit, EditSink};
use crate::engine::{Codemod, CodemodConfig, Detection, EngineError, ReviewGuidance, Transform, TraversalCtx};
use crate::lang::PyNode;
use std::collections::HashSet;

const NAME: &str = "combine-startswith-endswith";
const SUMMARY: &str = "Simplify Boolean Expressions Using `startswith` and `endswith`";
const DESCRIPTION: &str = "Use tuple of matches instead of boolean expression";

pub fn codemod() -> Result<Codemod, EngineError> {
    Codemod::new(
        CodemodConfig {
            name: NAME.to_string(),
            summary: SUMMARY.to_string(),
            description: DESCRIPTION.to_string(),
            review_guidance: ReviewGuidance::MergeWithoutReview,
            detection: Detection::Pattern("$A or $B".to_string()),
        },
        Box::new(CombineStartswithEndswith),
    )
}

struct CombineStartswithEndswith;

impl Transform for CombineStartswithEndswith {
    fn visit(&mut self, node: &PyNode<'_>, ctx: &mut TraversalCtx<'_>, sink: &mut EditSink) {
        if node.kind() != "boolean_operator" {
            return;
        }
        if !ctx.pattern_hit(node) || !ctx.selected(node) {
            return;
        }
        let Some(operator) = node.field("operator") else {
            return;
        };
        if operator.text() != "or" {
            return;
        }
        let (Some(left), Some(right)) = (node.field("left"), node.field("right")) else {
            return;
        };

        let Some(new_text) = rewrite(&left, &right) else {
            return;
        };

        let span = ctx.span(node);
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

fn rewrite<'t>(left: &PyNode<'t>, right: &PyNode<'t>) -> Option<String> {
    call_or_call(left, right)
        .or_else(|| call_or_chain(left, right))
        .or_else(|| chain_or_call(left, right))
}

/// `x.startswith(a) or x.startswith(b)`
fn call_or_call<'t>(left: &PyNode<'t>, right: &PyNode<'t>) -> Option<String> {
    let a = parse_call(left)?;
    let b = parse_call(right)?;
    combine(&a, &b)
}

/// `x.startswith(a) or x.startswith(b) <op> rest`: the right operand is a
/// chain whose first call merges with the left call; the chain remainder is
/// carried over verbatim.
fn call_or_chain<'t>(left: &PyNode<'t>, right: &PyNode<'t>) -> Option<String> {
    if right.kind() != "boolean_operator" {
        return None;
    }
    let a = parse_call(left)?;
    let b = parse_call(&right.field("left")?)?;
    let combined = combine(&a, &b)?;

    let op = right.field("operator")?.text();
    let rest = right.field("right")?.text();
    Some(format!("{combined} {op} {rest}"))
}

/// `rest <op> x.startswith(a) or x.startswith(b)`: the left operand is a
/// chain whose last call merges with the right call.
fn chain_or_call<'t>(left: &PyNode<'t>, right: &PyNode<'t>) -> Option<String> {
    if left.kind() != "boolean_operator" {
        return None;
    }
    let a = parse_call(&left.field("right")?)?;
    let b = parse_call(right)?;
    let combined = combine(&a, &b)?;

    let op = left.field("operator")?.text();
    let rest = left.field("left")?.text();
    Some(format!("{rest} {op} {combined}"))
}

/// A call of the shape `<name>.startswith(<arg>)` or `<name>.endswith(<arg>)`
/// with exactly one positional argument of a mergeable kind.
struct PrefixCall<'t> {
    receiver: String,
    method: String,
    arg: PyNode<'t>,
}

fn parse_call<'t>(node: &PyNode<'t>) -> Option<PrefixCall<'t>> {
    if node.kind() != "call" {
        return None;
    }
    let func = node.field("function")?;
    if func.kind() != "attribute" {
        return None;
    }
    let receiver = func.field("object")?;
    if receiver.kind() != "identifier" {
        return None;
    }
    let method = func.field("attribute")?.text().to_string();
    if method != "startswith" && method != "endswith" {
        return None;
    }

    let args: Vec<PyNode<'t>> = node
        .field("arguments")?
        .children()
        .filter(|c| c.is_named())
        .collect();
    let [arg] = args.as_slice() else {
        return None;
    };
    if !matches!(
        &*arg.kind(),
        "tuple" | "string" | "concatenated_string" | "identifier"
    ) {
        return None;
    }

    Some(PrefixCall {
        receiver: receiver.text().to_string(),
        method,
        arg: arg.clone(),
    })
}

/// Merge two calls on the same receiver and method into one tuple call.
fn combine<'t>(a: &PrefixCall<'t>, b: &PrefixCall<'t>) -> Option<String> {
    if a.receiver != b.receiver || a.method != b.method {
        return None;
    }

    let mut elements: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for arg in [&a.arg, &b.arg] {
        for element in flatten(arg) {
            match literal_value(&element) {
                Some(value) => {
                    if seen.insert(value) {
                        elements.push(element.text().to_string());
                    }
                }
                // No static value, keep the element unconditionally.
                None => elements.push(element.text().to_string()),
            }
        }
    }

    let joined = elements.join(", ");
    let tuple = if elements.len() == 1 {
        format!("({joined},)")
    } else {
        format!("({joined})")
    };
    Some(format!("{}.{}({})", a.receiver, a.method, tuple))
}

/// Tuple arguments contribute their elements; anything else contributes
/// itself.
fn flatten<'t>(arg: &PyNode<'t>) -> Vec<PyNode<'t>> {
    if arg.kind() == "tuple" {
        arg.children().filter(|c| c.is_named()).collect()
    } else {
        vec![arg.clone()]
    }
}

/// The evaluated value of a string element, used as the deduplication key.
///
/// Byte literals are keyed apart from text literals, raw strings keep their
/// backslashes, and f-strings have no static value.
fn literal_value(node: &PyNode<'_>) -> Option<String> {
    match &*node.kind() {
        "string" => string_value(&node.text()),
        "concatenated_string" => {
            let mut combined = String::new();
            for part in node.children().filter(|c| c.is_named()) {
                combined.push_str(&string_value(&part.text())?);
            }
            Some(combined)
        }
        _ => None,
    }
}

fn string_value(text: &str) -> Option<String> {
    let quote_pos = text.find(['\'', '"'])?;
    let prefix = text[..quote_pos].to_ascii_lowercase();
    if prefix.contains('f') {
        return None;
    }

    let inner = strip_quotes(&text[quote_pos..])?;
    let value = if prefix.contains('r') {
        inner.to_string()
    } else {
        unescape(inner)
    };
    let marker = if prefix.contains('b') { "b:" } else { "s:" };
    Some(format!("{marker}{value}"))
}

fn strip_quotes(text: &str) -> Option<&str> {
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if text.len() >= 2 * quote.len() && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[quote.len()..text.len() - quote.len()]);
        }
    }
    None
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            Some(m @ ('x' | 'u' | 'U')) => {
                let digits = match m {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                push_hex_escape(&mut out, &mut chars, m, digits);
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Decode a `\xNN` / `\uNNNN` / `\UNNNNNNNN` escape; a malformed one is
/// kept verbatim (the key only needs to be stable, not a Python value).
fn push_hex_escape(out: &mut String, chars: &mut std::str::Chars<'_>, marker: char, digits: usize) {
    let hex: String = chars.by_ref().take(digits).collect();
    let decoded = if hex.len() == digits {
        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
    } else {
        None
    };
    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(&hex);
        }
    }
}
