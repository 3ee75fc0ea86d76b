//! Session state - one caller's conversation and pending commitments.

mod turn;

pub use turn::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::escalation::{ArrivalEstimate, EscalationWindow};

/// Unique identifier for sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a nil session ID (for testing).
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the dialogue currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Greeting,
    Listening,
    /// Emergency matched; guidance is held until the window releases.
    EmergencyPending,
    MessageTaking,
    /// The previous prompt was restated; the next input is routed normally.
    Clarifying,
    Closed,
}

/// A message the caller left for the physician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenMessage {
    pub text: String,
    pub taken_at: DateTime<Utc>,
}

/// One caller's session.
///
/// Owned by the caller-facing layer and passed into the orchestrator on every
/// turn. History is append-only; only the orchestrator appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    state: DialogueState,
    history: Vec<Turn>,
    window: Option<EscalationWindow>,
    arrival: Option<ArrivalEstimate>,
    caller_location: Option<String>,
    last_guidance: Option<String>,
    messages: Vec<TakenMessage>,

    #[serde(skip)]
    awaiting_synthesis: bool,
}

/// A session shared between tasks of the caller-facing layer.
pub type SessionHandle = Arc<Mutex<Session>>;

impl Session {
    /// Create a new session in the `Greeting` state.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            created_at,
            state: DialogueState::Greeting,
            history: Vec::new(),
            window: None,
            arrival: None,
            caller_location: None,
            last_guidance: None,
            messages: Vec::new(),
            awaiting_synthesis: false,
        }
    }

    /// Wrap the session for sharing between tasks.
    pub fn into_handle(self) -> SessionHandle {
        Arc::new(Mutex::new(self))
    }

    /// Get the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the current dialogue state.
    pub fn state(&self) -> DialogueState {
        self.state
    }

    /// The conversation so far, in order.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The pending escalation window, if guidance is being held back.
    pub fn window(&self) -> Option<&EscalationWindow> {
        self.window.as_ref()
    }

    /// The committed arrival estimate, if one was made.
    pub fn arrival(&self) -> Option<&ArrivalEstimate> {
        self.arrival.as_ref()
    }

    /// Location the caller gave while guidance was held.
    pub fn caller_location(&self) -> Option<&str> {
        self.caller_location.as_deref()
    }

    /// The most recently released guidance text.
    pub fn last_guidance(&self) -> Option<&str> {
        self.last_guidance.as_deref()
    }

    /// Messages left for the physician, oldest first.
    pub fn messages(&self) -> &[TakenMessage] {
        &self.messages
    }

    /// True while a shared turn waits on the synthesizer.
    pub fn is_awaiting_synthesis(&self) -> bool {
        self.awaiting_synthesis
    }

    /// The most recent assistant turn.
    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.history.iter().rev().find(|turn| turn.is_assistant())
    }

    pub(crate) fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    pub(crate) fn set_state(&mut self, state: DialogueState) {
        self.state = state;
    }

    pub(crate) fn window_mut(&mut self) -> Option<&mut EscalationWindow> {
        self.window.as_mut()
    }

    pub(crate) fn set_window(&mut self, window: EscalationWindow) {
        self.window = Some(window);
    }

    pub(crate) fn take_window(&mut self) -> Option<EscalationWindow> {
        self.window.take()
    }

    pub(crate) fn set_arrival(&mut self, arrival: ArrivalEstimate) {
        self.arrival = Some(arrival);
    }

    pub(crate) fn set_caller_location(&mut self, location: impl Into<String>) {
        self.caller_location = Some(location.into());
    }

    pub(crate) fn set_last_guidance(&mut self, guidance: impl Into<String>) {
        self.last_guidance = Some(guidance.into());
    }

    pub(crate) fn push_message(&mut self, message: TakenMessage) {
        self.messages.push(message);
    }

    pub(crate) fn set_awaiting_synthesis(&mut self, awaiting: bool) {
        self.awaiting_synthesis = awaiting;
    }
}

/// Lock a shared session. A poisoned lock still yields the session; its
/// history is only ever appended to whole turns at a time.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, Session> {
    handle
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let now = Utc::now();
        let session = Session::new(now);

        assert_eq!(session.state(), DialogueState::Greeting);
        assert!(session.history().is_empty());
        assert!(session.window().is_none());
        assert!(session.arrival().is_none());
        assert!(!session.is_awaiting_synthesis());
        assert_eq!(session.created_at(), now);
    }

    #[test]
    fn test_last_assistant_turn() {
        let now = Utc::now();
        let mut session = Session::new(now);
        assert!(session.last_assistant_turn().is_none());

        session.push_turn(Turn::assistant(TurnKind::Greeting, "Hello", now));
        session.push_turn(Turn::caller("hi", now));

        let last = session.last_assistant_turn().unwrap();
        assert_eq!(last.text, "Hello");
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_shared_handle() {
        let handle = Session::new(Utc::now()).into_handle();
        let id = lock_session(&handle).id();

        lock_session(&handle).set_state(DialogueState::Listening);
        let session = lock_session(&handle);
        assert_eq!(session.id(), id);
        assert_eq!(session.state(), DialogueState::Listening);
    }

    #[test]
    fn test_session_serialization_skips_flag() {
        let mut session = Session::new(Utc::now());
        session.set_awaiting_synthesis(true);

        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("awaiting_synthesis"));

        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), session.id());
        assert!(!back.is_awaiting_synthesis());
    }
}
