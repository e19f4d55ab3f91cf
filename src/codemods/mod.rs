//! The built-in codemod catalog.

mod combine_startswith_endswith;
mod use_walrus_if;

use crate::engine::{Codemod, EngineError};

pub use combine_startswith_endswith::codemod as combine_startswith_endswith;
pub use use_walrus_if::codemod as use_walrus_if;

/// Every built-in codemod, in execution order.
pub fn default_codemods() -> Result<Vec<Codemod>, EngineError> {
    Ok(vec![combine_startswith_endswith()?, use_walrus_if()?])
}
