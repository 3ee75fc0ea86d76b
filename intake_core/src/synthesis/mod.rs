//! Response synthesis - the seam to the external text-generation collaborator.
//!
//! Anything the dialogue does not script (small talk, questions about the
//! practice, follow-ups on a described emergency) is handed to a
//! [`ResponseSynthesizer`] together with the history and the knowledge base.
//! The orchestrator appends whatever comes back; synthesizers never touch the
//! session.

mod prompt;

pub use prompt::*;

use async_trait::async_trait;
use intake_protocol::KnowledgeBase;
use thiserror::Error;

use crate::session::Turn;

/// Failures of a synthesizer call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("synthesizer unavailable: {0}")]
    Unavailable(String),

    #[error("synthesizer did not answer within {0} seconds")]
    Timeout(u64),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request rejected with status {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("synthesizer returned no text")]
    EmptyResponse,

    #[error("synthesizer misconfigured: {0}")]
    Configuration(String),
}

impl SynthesisError {
    /// Whether resubmitting the same input may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Unavailable(_)
            | SynthesisError::Timeout(_)
            | SynthesisError::Transport(_)
            | SynthesisError::EmptyResponse => true,
            SynthesisError::Rejected { retryable, .. } => *retryable,
            SynthesisError::Configuration(_) => false,
        }
    }
}

/// Produces a best-effort reply for input the dialogue does not script.
///
/// Implementations may be slow and may fail; both are expected. `history` is
/// the conversation before `raw_input`.
#[async_trait]
pub trait ResponseSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        history: &[Turn],
        raw_input: &str,
        knowledge_base: &KnowledgeBase,
    ) -> Result<String, SynthesisError>;
}
