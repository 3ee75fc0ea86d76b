//! Knowledge table - the read-only category to guidance mapping.

use serde::Serialize;
use std::collections::HashMap;

use super::{fold_case, EmergencyCategory, GuidanceEntry};
use crate::ProtocolError;

/// The emergency knowledge base.
///
/// Entries keep insertion order; that order is used whenever guidance for
/// several categories is combined. Lookups by category go through an index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KnowledgeBase {
    entries: Vec<GuidanceEntry>,

    #[serde(skip)]
    index: HashMap<EmergencyCategory, usize>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a knowledge base from entries, rejecting invalid or duplicate ones.
    pub fn from_entries(
        entries: impl IntoIterator<Item = GuidanceEntry>,
    ) -> Result<Self, ProtocolError> {
        let mut base = Self::new();
        for entry in entries {
            base.insert(entry)?;
        }
        Ok(base)
    }

    /// The reference table of five emergencies.
    pub fn reference() -> Self {
        let entries = vec![
            GuidanceEntry::new(
                "not breathing",
                "Perform CPR immediately. Place your hands on the center of the chest and push hard and fast at a rate of 100-120 compressions per minute. After every 30 compressions, give 2 rescue breaths.",
            )
            .with_aliases([
                "can't breathe",
                "cannot breathe",
                "can not breathe",
                "stopped breathing",
                "isn't breathing",
            ]),
            GuidanceEntry::new(
                "chest pain",
                "Have the person sit down and rest. If available, give them an aspirin to chew. Loosen any tight clothing.",
            )
            .with_aliases(["chest hurts", "heart attack"]),
            GuidanceEntry::new(
                "severe bleeding",
                "Apply direct pressure to the wound with a clean cloth or bandage. Elevate the injured area above the heart if possible.",
            )
            .with_aliases(["bleeding heavily", "won't stop bleeding"]),
            GuidanceEntry::new(
                "unconscious",
                "Check for breathing. If they are breathing, place them in the recovery position. If not breathing, start CPR immediately.",
            )
            .with_aliases(["passed out", "unresponsive", "fainted"]),
            GuidanceEntry::new(
                "allergic reaction",
                "If the person has an EpiPen, help them use it. Remove any potential allergens and help them into a comfortable position.",
            )
            .with_aliases(["anaphylaxis", "anaphylactic"]),
        ];

        let mut base = Self::new();
        for entry in entries {
            let id = base.entries.len();
            base.index.insert(entry.category.clone(), id);
            base.entries.push(entry);
        }
        base
    }

    /// Add an entry to the knowledge base.
    pub fn insert(&mut self, entry: GuidanceEntry) -> Result<(), ProtocolError> {
        entry.validate()?;
        if self.index.contains_key(&entry.category) {
            return Err(ProtocolError::DuplicateCategory(entry.category.to_string()));
        }
        self.index.insert(entry.category.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Builder form of [`KnowledgeBase::insert`].
    pub fn with_entry(mut self, entry: GuidanceEntry) -> Result<Self, ProtocolError> {
        self.insert(entry)?;
        Ok(self)
    }

    /// Look up the guidance text for a category key (case-insensitive).
    pub fn lookup(&self, category: &str) -> Option<&str> {
        self.get(&EmergencyCategory::new(category))
            .map(|entry| entry.guidance.as_str())
    }

    /// Get the full entry for a category.
    pub fn get(&self, category: &EmergencyCategory) -> Option<&GuidanceEntry> {
        self.index.get(category).map(|&id| &self.entries[id])
    }

    /// Combine the guidance for several categories in knowledge-base order,
    /// separated by a blank line. Unknown categories are skipped.
    pub fn combined_guidance(&self, categories: &[EmergencyCategory]) -> String {
        self.entries
            .iter()
            .filter(|entry| categories.contains(&entry.category))
            .map(|entry| entry.guidance.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// All entries matching the input, in knowledge-base order.
    pub fn matching(&self, input: &str) -> Vec<&GuidanceEntry> {
        let folded = fold_case(input);
        self.entries
            .iter()
            .filter(|entry| entry.matches_folded(&folded))
            .collect()
    }

    /// Iterate over entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &GuidanceEntry> {
        self.entries.iter()
    }

    /// Iterate over categories in insertion order.
    pub fn categories(&self) -> impl Iterator<Item = &EmergencyCategory> {
        self.entries.iter().map(|entry| &entry.category)
    }

    /// Position of a category in insertion order.
    pub fn position(&self, category: &EmergencyCategory) -> Option<usize> {
        self.index.get(category).copied()
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no categories.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table() {
        let base = KnowledgeBase::reference();
        assert_eq!(base.len(), 5);

        let categories: Vec<_> = base.categories().map(|c| c.as_str()).collect();
        assert_eq!(
            categories,
            vec![
                "not breathing",
                "chest pain",
                "severe bleeding",
                "unconscious",
                "allergic reaction"
            ]
        );
        assert!(base.entries().all(|entry| entry.validate().is_ok()));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let base = KnowledgeBase::reference();

        let guidance = base.lookup("Chest Pain");
        assert!(guidance.is_some());
        assert!(guidance.unwrap().starts_with("Have the person sit down"));

        assert!(base.lookup("broken arm").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut base = KnowledgeBase::new();
        base.insert(GuidanceEntry::new("burn", "Cool the burn under running water."))
            .unwrap();

        let result = base.insert(GuidanceEntry::new("BURN", "Something else."));
        assert!(matches!(result, Err(ProtocolError::DuplicateCategory(c)) if c == "burn"));
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_combined_guidance_uses_table_order() {
        let base = KnowledgeBase::from_entries([
            GuidanceEntry::new("first", "One."),
            GuidanceEntry::new("second", "Two."),
        ])
        .unwrap();

        let combined = base.combined_guidance(&[
            EmergencyCategory::new("second"),
            EmergencyCategory::new("first"),
        ]);
        assert_eq!(combined, "One.\n\nTwo.");

        let single = base.combined_guidance(&[EmergencyCategory::new("second")]);
        assert_eq!(single, "Two.");
    }

    #[test]
    fn test_matching_entries() {
        let base = KnowledgeBase::reference();

        let matched: Vec<_> = base
            .matching("Severe bleeding and UNCONSCIOUS")
            .into_iter()
            .map(|entry| entry.category.as_str())
            .collect();
        assert_eq!(matched, vec!["severe bleeding", "unconscious"]);

        assert!(base.matching("what are your opening hours").is_empty());
    }
}
