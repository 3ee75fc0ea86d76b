//! Category definitions - keys and entries of the knowledge base.

use serde::{Deserialize, Serialize};

use super::fold_case;
use crate::ProtocolError;

/// A known emergency category, stored case-folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmergencyCategory(String);

impl EmergencyCategory {
    /// Create a category from a key; the key is trimmed and case-folded.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(fold_case(key.as_ref().trim()))
    }

    /// The case-folded category key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmergencyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EmergencyCategory {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// One row of the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceEntry {
    pub category: EmergencyCategory,

    /// Extra match terms that also select this category (case-folded).
    pub aliases: Vec<String>,

    /// Canonical guidance text, surfaced verbatim.
    pub guidance: String,
}

impl GuidanceEntry {
    /// Create an entry with no aliases.
    pub fn new(category: impl AsRef<str>, guidance: impl Into<String>) -> Self {
        Self {
            category: EmergencyCategory::new(category),
            aliases: Vec::new(),
            guidance: guidance.into(),
        }
    }

    /// Add an alias match term.
    pub fn with_alias(mut self, alias: impl AsRef<str>) -> Self {
        self.aliases.push(fold_case(alias.as_ref().trim()));
        self
    }

    /// Add several alias match terms.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|a| fold_case(a.as_ref().trim())));
        self
    }

    /// The key followed by every alias.
    pub fn match_terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.category.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Check whether already-folded input contains any match term.
    pub fn matches_folded(&self, folded_input: &str) -> bool {
        self.match_terms().any(|term| folded_input.contains(term))
    }

    pub(crate) fn validate(&self) -> Result<(), ProtocolError> {
        if self.match_terms().any(str::is_empty) {
            return Err(ProtocolError::EmptyMatchTerm {
                category: self.category.to_string(),
            });
        }
        if self.guidance.trim().is_empty() {
            return Err(ProtocolError::MissingGuidance(self.category.to_string()));
        }
        Ok(())
    }
}
