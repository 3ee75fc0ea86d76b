//! Category classifier - matches caller input against the knowledge base and
//! the policy's intent cues.
//!
//! Category matching is substring containment on case-folded text, so a key
//! can sit anywhere in the utterance. Cue matching works on whole words, so
//! "bye" does not fire on "maybe".

use intake_protocol::{fold_case, Cues, EmergencyCategory, KnowledgeBase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The categories an utterance matched, in knowledge-base order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    categories: Vec<EmergencyCategory>,
}

impl Classification {
    /// Create a classification from categories already in knowledge-base order.
    pub fn new(categories: Vec<EmergencyCategory>) -> Self {
        Self { categories }
    }

    /// Matched categories in knowledge-base order.
    pub fn categories(&self) -> &[EmergencyCategory] {
        &self.categories
    }

    /// Check whether a category matched, ignoring case.
    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains(&EmergencyCategory::new(category))
    }

    /// True when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// More than one category matched. Legitimate, never a fault.
    pub fn is_ambiguous(&self) -> bool {
        self.categories.len() > 1
    }

    /// Number of matched categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }
}

/// Non-emergency intents found in an utterance. Several may be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntentSignals {
    pub message: bool,
    pub closing: bool,
    pub impatience: bool,
    /// An emergency without a recognizable category.
    pub emergency: bool,
    /// The whole utterance is closing and courtesy phrases, e.g. "ok, bye".
    pub closing_only: bool,
}

impl IntentSignals {
    /// True when at least one cue fired.
    pub fn any(&self) -> bool {
        self.message || self.closing || self.impatience || self.emergency
    }
}

/// Cue phrases pre-split into words.
#[derive(Debug, Clone, Default)]
struct CuePhrases {
    message: Vec<Vec<String>>,
    closing: Vec<Vec<String>>,
    impatience: Vec<Vec<String>>,
    emergency: Vec<Vec<String>>,
    courtesy: Vec<Vec<String>>,
}

impl CuePhrases {
    fn from_cues(cues: &Cues) -> Self {
        let split = |phrases: &[String]| -> Vec<Vec<String>> {
            phrases
                .iter()
                .map(|phrase| words(phrase))
                .filter(|phrase| !phrase.is_empty())
                .collect()
        };

        Self {
            message: split(&cues.message),
            closing: split(&cues.closing),
            impatience: split(&cues.impatience),
            emergency: split(&cues.emergency),
            courtesy: split(&cues.courtesy),
        }
    }
}

/// Classifies caller input. Cheap to clone; the knowledge base is shared.
#[derive(Debug, Clone)]
pub struct Classifier {
    knowledge_base: Arc<KnowledgeBase>,
    cues: CuePhrases,
}

impl Classifier {
    /// Create a classifier over a shared knowledge base and the policy's cues.
    pub fn new(knowledge_base: Arc<KnowledgeBase>, cues: &Cues) -> Self {
        Self {
            knowledge_base,
            cues: CuePhrases::from_cues(cues),
        }
    }

    /// The knowledge base categories are matched against.
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// Match the input against every category's key and aliases.
    pub fn classify(&self, raw_input: &str) -> Classification {
        Classification::new(
            self.knowledge_base
                .matching(raw_input)
                .into_iter()
                .map(|entry| entry.category.clone())
                .collect(),
        )
    }

    /// Find the intent cues present in the input.
    pub fn detect_intent(&self, raw_input: &str) -> IntentSignals {
        let input = words(raw_input);
        let found = |phrases: &[Vec<String>]| phrases.iter().any(|p| contains_phrase(&input, p));

        let closing = found(&self.cues.closing);
        let closing_only = closing
            && is_covered_by(
                &input,
                self.cues.closing.iter().chain(self.cues.courtesy.iter()),
            );

        IntentSignals {
            message: found(&self.cues.message),
            closing,
            impatience: found(&self.cues.impatience),
            emergency: found(&self.cues.emergency),
            closing_only,
        }
    }
}

/// True when the input has nothing a person could read as words.
pub fn is_unreadable(raw_input: &str) -> bool {
    !raw_input.chars().any(char::is_alphabetic)
}

/// Split case-folded text into words, keeping in-word apostrophes.
fn words(text: &str) -> Vec<String> {
    fold_case(text)
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|word| word.trim_matches('\''))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(input: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && input.windows(phrase.len()).any(|window| window == phrase)
}

/// True when the input splits exactly into a sequence of the phrases.
fn is_covered_by<'a>(input: &[String], phrases: impl Iterator<Item = &'a Vec<String>> + Clone) -> bool {
    let mut reachable = vec![false; input.len() + 1];
    reachable[0] = true;
    for start in 0..input.len() {
        if !reachable[start] {
            continue;
        }
        for phrase in phrases.clone() {
            if !phrase.is_empty() && input[start..].starts_with(phrase) {
                reachable[start + phrase.len()] = true;
            }
        }
    }
    !input.is_empty() && reachable[input.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(KnowledgeBase::reference()), &Cues::default())
    }

    #[test]
    fn test_classify_key_any_case_any_position() {
        let classifier = classifier();

        for input in [
            "chest pain",
            "My father has CHEST PAIN right now",
            "help!!chest painful breathing",
        ] {
            let result = classifier.classify(input);
            assert!(result.contains("chest pain"), "input: {input}");
        }
    }

    #[test]
    fn test_classify_alias() {
        let result = classifier().classify("I can\u{2019}t breathe");
        assert_eq!(result.categories(), &[EmergencyCategory::new("not breathing")]);
        assert!(!result.is_ambiguous());
    }

    #[test]
    fn test_classify_no_match() {
        let classifier = classifier();
        for input in ["", "I'd like to leave a message", "xyz nonsense", "what time do you open"] {
            assert!(classifier.classify(input).is_empty(), "input: {input}");
        }
    }

    #[test]
    fn test_classify_multiple_matches() {
        let result = classifier().classify("Severe bleeding and unconscious");

        assert!(result.is_ambiguous());
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.categories(),
            &[
                EmergencyCategory::new("severe bleeding"),
                EmergencyCategory::new("unconscious")
            ]
        );
    }

    #[test]
    fn test_classify_reports_each_category_once() {
        let result = classifier().classify("not breathing, he stopped breathing");
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_detect_intent() {
        let classifier = classifier();

        let message = classifier.detect_intent("I'd like to leave a message");
        assert!(message.message);
        assert!(!message.closing);

        let impatient = classifier.detect_intent("Please HURRY");
        assert!(impatient.impatience);

        let closing = classifier.detect_intent("That\u{2019}s all, goodbye.");
        assert!(closing.closing);

        let generic = classifier.detect_intent("it's an emergency");
        assert!(generic.emergency);

        assert!(!classifier.detect_intent("xyz nonsense").any());
    }

    #[test]
    fn test_cues_match_whole_words() {
        let classifier = classifier();
        assert!(!classifier.detect_intent("maybe tomorrow").closing);
        assert!(!classifier.detect_intent("she is helpful").emergency);
        assert!(classifier.detect_intent("bye now").closing);
    }

    #[test]
    fn test_closing_only_needs_whole_utterance() {
        let classifier = classifier();

        for input in ["bye", "Goodbye!", "ok, thank you, that's all", "no thanks, bye"] {
            assert!(classifier.detect_intent(input).closing_only, "input: {input}");
        }

        let inside_message = classifier.detect_intent("Tell him goodbye, I am moving to Leeds");
        assert!(inside_message.closing);
        assert!(!inside_message.closing_only);
        assert!(!classifier.detect_intent("thanks").closing_only);
        assert!(!classifier.detect_intent("").closing_only);
    }

    #[test]
    fn test_is_unreadable() {
        assert!(is_unreadable(""));
        assert!(is_unreadable("   ?!"));
        assert!(is_unreadable("1234"));
        assert!(!is_unreadable("xyz"));
    }
}
