//! Intent cue phrases.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Phrases that signal a non-emergency intent. Matched on word boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cues {
    pub message: Vec<String>,
    pub closing: Vec<String>,
    /// Concern about how long help is taking.
    pub impatience: Vec<String>,
    /// An emergency with no recognizable category.
    pub emergency: Vec<String>,
    /// Pleasantries that may surround a closing cue. A message counts as
    /// closing the call only when it is made of closing and courtesy phrases.
    pub courtesy: Vec<String>,
}

impl Cues {
    pub(crate) fn validate(&self) -> Result<(), ProtocolError> {
        let groups = [
            ("message", &self.message),
            ("closing", &self.closing),
            ("impatience", &self.impatience),
            ("emergency", &self.emergency),
            ("courtesy", &self.courtesy),
        ];
        for (name, phrases) in groups {
            if phrases.iter().any(|p| p.trim().is_empty()) {
                return Err(ProtocolError::InvalidPolicy(format!(
                    "empty phrase in {name} cues"
                )));
            }
        }
        Ok(())
    }
}

fn phrases(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Cues {
    fn default() -> Self {
        Self {
            message: phrases(&["message", "leave a note", "pass along", "pass on"]),
            closing: phrases(&[
                "bye",
                "goodbye",
                "that's all",
                "that is all",
                "hang up",
                "no thanks",
                "nothing else",
            ]),
            impatience: phrases(&[
                "hurry",
                "too late",
                "too long",
                "how long",
                "taking so long",
                "faster",
                "when will",
            ]),
            emergency: phrases(&[
                "emergency",
                "urgent",
                "help",
                "hurt",
                "injured",
                "accident",
            ]),
            courtesy: phrases(&["thanks", "thank you", "ok", "okay", "please", "no", "that's it"]),
        }
    }
}
