//! Turn definitions - entries of the conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub Uuid);

impl TurnId {
    /// Create a new random turn ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who spoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Caller,
    Assistant,
}

/// What an assistant turn was for. Caller turns are always `Utterance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Utterance,
    Greeting,
    /// Holding line sent when an emergency is first matched.
    Stall,
    /// Holding line sent when the caller is impatient during the stall.
    Reassurance,
    LocationNoted,
    StayOnLine,
    /// Released emergency guidance.
    Guidance,
    /// Guidance delivered again after the caller worried about the delay.
    GuidanceRepeat,
    DetailsPrompt,
    MessagePrompt,
    MessageConfirmation,
    Closing,
    /// Text produced by the response synthesizer.
    Synthesized,
}

impl TurnKind {
    /// Holding lines that keep the caller on the line while guidance is withheld.
    pub fn is_stall(&self) -> bool {
        matches!(
            self,
            TurnKind::Stall | TurnKind::Reassurance | TurnKind::LocationNoted | TurnKind::StayOnLine
        )
    }

    /// Turns that carry emergency guidance.
    pub fn is_guidance(&self) -> bool {
        matches!(self, TurnKind::Guidance | TurnKind::GuidanceRepeat)
    }

    /// Prompts that expect one of a fixed set of answers; anything else is
    /// treated as unclear and the prompt is restated.
    pub fn is_closed_question(&self) -> bool {
        matches!(self, TurnKind::Greeting)
    }
}

/// One immutable utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub kind: TurnKind,
}

impl Turn {
    /// A caller utterance.
    pub fn caller(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TurnId::new(),
            role: Role::Caller,
            text: text.into(),
            created_at,
            kind: TurnKind::Utterance,
        }
    }

    /// An assistant utterance of the given kind.
    pub fn assistant(kind: TurnKind, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TurnId::new(),
            role: Role::Assistant,
            text: text.into(),
            created_at,
            kind,
        }
    }

    /// True for turns spoken by the assistant.
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
