//! Format-preserving codemods for Python source.
//!
//! `pycodemod` locates rewrite sites with structural pattern matching or
//! externally loaded findings, rewrites them through verified byte-span
//! edits, and refuses any rewrite that would introduce new parse errors.
//! Everything outside the edited spans, including comments and whitespace,
//! survives byte for byte.
//!
//! # Architecture
//!
//! All rewrites compile down to a single primitive: [`Edit`], a verified
//! byte-span replacement. Intelligence lives in span acquisition (tree
//! traversal, ast-grep patterns, finding correlation), not in the
//! application logic. The layers, bottom up:
//!
//! - [`position`], [`edit`]: byte-offset coordinates and the verified
//!   edit primitive with atomic file replacement
//! - [`lang`], [`pattern`]: Python parsing and ast-grep pattern matching
//! - [`findings`], [`filter`], [`context`]: external findings ingestion,
//!   path and line filtering, per-file session state
//! - [`engine`]: codemod registration, post-order traversal, the parse
//!   gate, and the session runner
//! - [`codemods`]: the built-in catalog
//!
//! # Example
//!
//! ```no_run
//! use pycodemod::{FileContext, Session};
//!
//! # fn main() -> Result<(), pycodemod::EngineError> {
//! let mut session = Session::new(pycodemod::codemods::default_codemods()?);
//! let mut file = FileContext::new("app.py");
//! let outcome = session.process_file(&mut file)?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod codemods;
pub mod context;
pub mod edit;
pub mod engine;
pub mod filter;
pub mod findings;
pub mod lang;
pub mod pattern;
pub mod position;

pub use context::{Change, ChangeRegistry, FileContext};
pub use edit::{Edit, EditError, EditSink, EditVerification};
pub use engine::{
    Codemod, CodemodConfig, Detection, EngineError, FileOutcome, ReviewGuidance, Session,
    Transform, TraversalCtx,
};
pub use filter::{LineFilter, LineRange, PathFilter};
pub use findings::{Finding, FindingSet};
pub use position::{LineCol, LineIndex, SourceSpan};
