//! Error types for the intake dialogue.
//!
//! Every error is scoped to one session and one turn; none of them ends the
//! session. A multi-category match is not an error (see
//! [`Classification::is_ambiguous`](crate::Classification::is_ambiguous)).

use intake_protocol::ProtocolError;
use thiserror::Error;

use crate::session::SessionId;
use crate::synthesis::SynthesisError;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// The synthesizer failed or timed out. History is unchanged; the caller
    /// may resubmit the same input.
    #[error("response synthesis unavailable for session {session}: {source}")]
    SynthesisUnavailable {
        session: SessionId,
        #[source]
        source: SynthesisError,
    },

    /// Input arrived while another turn for the same session was in flight.
    #[error("session {session} cannot accept input: {reason}")]
    InvalidTransition { session: SessionId, reason: String },

    /// The orchestrator was built from an invalid policy.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl IntakeError {
    /// Create a synthesis failure for a session.
    pub fn synthesis_unavailable(session: SessionId, source: SynthesisError) -> Self {
        Self::SynthesisUnavailable { session, source }
    }

    /// Create a rejected-input error for a session.
    pub fn invalid_transition(session: SessionId, reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            session,
            reason: reason.into(),
        }
    }

    /// Whether resubmitting the same input may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SynthesisUnavailable { source, .. } => source.is_retryable(),
            Self::InvalidTransition { .. } => true,
            Self::Protocol(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let session = SessionId::nil();

        let busy = IntakeError::invalid_transition(session, "synthesis in flight");
        assert!(busy.to_string().contains("synthesis in flight"));
        assert!(busy.is_retryable());

        let down = IntakeError::synthesis_unavailable(session, SynthesisError::Timeout(30));
        assert!(down.to_string().contains("unavailable"));
        assert!(down.is_retryable());

        let bad = IntakeError::from(ProtocolError::InvalidPolicy("x".to_string()));
        assert!(!bad.is_retryable());
    }
}
