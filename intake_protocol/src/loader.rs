//! Protocol loading from TOML.
//!
//! ```toml
//! [policy]
//! stall_seconds = 15
//! rearm = "merge"
//!
//! [[categories]]
//! key = "not breathing"
//! aliases = ["can't breathe"]
//! guidance = "Perform CPR immediately."
//! ```
//!
//! Omitting `categories` keeps the reference knowledge base; omitted policy
//! fields keep their reference values.

use serde::Deserialize;
use std::path::Path;

use crate::{GuidanceEntry, IntakePolicy, KnowledgeBase, ProtocolError};

/// A validated knowledge base and policy pair.
#[derive(Debug, Clone)]
pub struct Protocol {
    pub knowledge_base: KnowledgeBase,
    pub policy: IntakePolicy,
}

#[derive(Debug, Deserialize)]
struct ProtocolFile {
    #[serde(default)]
    policy: IntakePolicy,
    categories: Option<Vec<CategoryRecord>>,
}

#[derive(Debug, Deserialize)]
struct CategoryRecord {
    key: String,
    #[serde(default)]
    aliases: Vec<String>,
    guidance: String,
}

impl Protocol {
    /// Reference knowledge base with the reference policy.
    pub fn reference() -> Self {
        Self {
            knowledge_base: KnowledgeBase::reference(),
            policy: IntakePolicy::reference(),
        }
    }

    /// Parse and validate a protocol document.
    pub fn from_toml_str(source: &str) -> Result<Self, ProtocolError> {
        let file: ProtocolFile = toml::from_str(source)?;
        file.policy.validate()?;

        let knowledge_base = match file.categories {
            Some(records) => KnowledgeBase::from_entries(records.into_iter().map(|record| {
                GuidanceEntry::new(record.key, record.guidance).with_aliases(record.aliases)
            }))?,
            None => KnowledgeBase::reference(),
        };

        Ok(Self {
            knowledge_base,
            policy: file.policy,
        })
    }

    /// Read and parse a protocol file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
