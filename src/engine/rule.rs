//! External rule specification normalization.
//!
//! Rule-based codemods carry a YAML document with a `rules` list understood
//! by the external pattern engine. Exactly one rule entry is supported per
//! codemod. Before the document is handed anywhere, its optional fields are
//! filled in: a missing `id` defaults to the codemod name, and `message`,
//! `severity` and `languages` take fixed defaults. Normalization happens
//! once at codemod registration, never per file.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const DEFAULT_MESSAGE: &str = "Rule engine found a match";
const DEFAULT_SEVERITY: &str = "WARNING";
const DEFAULT_LANGUAGE: &str = "python";

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule document has no `rules` list")]
    MissingRules,

    #[error("rule document must contain exactly one rule, found {0}")]
    RuleCount(usize),

    #[error("rule entry is not a mapping")]
    NotAMapping,

    #[error("normalized rule has no usable id")]
    MissingId,

    #[error("invalid rule YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A normalized rule: its resolved id and the defaults-filled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    id: String,
    document: String,
}

impl RuleSpec {
    /// Parse and normalize a rule document.
    pub fn normalize(yaml: &str, default_id: &str) -> Result<Self, RuleError> {
        let mut doc: Value = serde_yaml::from_str(yaml)?;

        let rules = doc
            .get_mut("rules")
            .and_then(Value::as_sequence_mut)
            .ok_or(RuleError::MissingRules)?;
        if rules.len() != 1 {
            return Err(RuleError::RuleCount(rules.len()));
        }

        let entry = rules[0].as_mapping_mut().ok_or(RuleError::NotAMapping)?;
        set_default(entry, "id", Value::String(default_id.to_string()));
        set_default(entry, "message", Value::String(DEFAULT_MESSAGE.to_string()));
        set_default(entry, "severity", Value::String(DEFAULT_SEVERITY.to_string()));
        set_default(
            entry,
            "languages",
            Value::Sequence(vec![Value::String(DEFAULT_LANGUAGE.to_string())]),
        );

        let id = entry
            .get(Value::String("id".to_string()))
            .and_then(Value::as_str)
            .ok_or(RuleError::MissingId)?
            .to_string();

        let document = serde_yaml::to_string(&doc)?;
        Ok(Self { id, document })
    }

    /// The rule identifier findings are correlated against.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The defaults-filled YAML document for the external pattern engine.
    pub fn document(&self) -> &str {
        &self.document
    }
}

fn set_default(entry: &mut Mapping, key: &str, value: Value) {
    let key = Value::String(key.to_string());
    if !entry.contains_key(&key) {
        entry.insert(key, value);
    }
}
