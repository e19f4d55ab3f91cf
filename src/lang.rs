//! Python language support via ast-grep-language.
//!
//! We use the built-in `SupportLang::Python` from ast-grep-language instead
//! of maintaining our own Language implementation; it handles metavariable
//! preprocessing and tree-sitter integration automatically. The same grammar
//! backs a raw tree-sitter parser used for post-edit parse validation.

use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, Node};
use ast_grep_language::LanguageExt;
use thiserror::Error;
use tree_sitter::{Parser, Tree};

pub use ast_grep_language::SupportLang;

/// Document type for Python syntax trees.
pub type PyDoc = StrDoc<SupportLang>;
/// A parsed Python source tree.
pub type PyTree = AstGrep<PyDoc>;
/// A node of a Python syntax tree.
pub type PyNode<'t> = Node<'t, PyDoc>;

/// Get the Python language for ast-grep operations.
pub fn python() -> SupportLang {
    SupportLang::Python
}

/// Parse Python source into an ast-grep tree.
pub fn parse(source: &str) -> PyTree {
    AstGrep::new(source, python())
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to configure Python grammar")]
    LanguageSet,

    #[error("tree-sitter failed to parse source")]
    ParseFailed,
}

/// Tree-sitter parser wrapper for Python source code.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let ts_lang = SupportLang::Python.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| ParseError::LanguageSet)?;

        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or(ParseError::ParseFailed)
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(&mut self, source: &'a str) -> Result<ParsedSource<'a>, ParseError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl ParsedSource<'_> {
    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        !self.error_spans().is_empty()
    }

    /// Byte spans of all ERROR and MISSING nodes in the tree.
    pub fn error_spans(&self) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        collect_error_spans(self.tree.root_node(), &mut spans);
        spans
    }
}

fn collect_error_spans(node: tree_sitter::Node<'_>, spans: &mut Vec<(usize, usize)>) {
    if node.is_error() || node.is_missing() {
        spans.push((node.start_byte(), node.end_byte()));
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_spans(child, spans);
    }
}

/// Check whether `edited` has parse errors not present in `original`.
///
/// Hard rule inherited by every rewrite: if an edit introduces new ERROR
/// nodes, the rewrite must be rolled back.
pub fn introduces_errors(original: &str, edited: &str) -> Result<bool, ParseError> {
    let mut parser = PythonParser::new()?;
    let original_errors = parser.parse_with_source(original)?.error_spans().len();
    let edited_errors = parser.parse_with_source(edited)?.error_spans().len();
    Ok(edited_errors > original_errors)
}
