//! Dialogue orchestrator - the turn-by-turn state machine.
//!
//! Each caller input is handled in three steps:
//! 1. **Route**: Classify the input and pick an action for the current state
//! 2. **Reply**: Run the action (arm the window, release guidance, take a
//!    message...) or ask the synthesizer
//! 3. **Commit**: Append the caller turn and the reply together
//!
//! Nothing is appended when the synthesizer fails, so a failed turn can be
//! resubmitted as is.

mod routing;

use chrono::{DateTime, Utc};
use intake_protocol::{minutes_phrase, render_script, IntakePolicy, KnowledgeBase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::error::IntakeError;
use crate::escalation::{ArmOutcome, EscalationTimer};
use crate::session::{
    lock_session, DialogueState, Session, SessionHandle, SessionId, TakenMessage, Turn, TurnKind,
};
use crate::synthesis::{ResponseSynthesizer, SynthesisError};
use routing::Action;

/// The result of one caller turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub caller_turn: Turn,
    pub reply: Turn,
    /// State after the reply.
    pub state: DialogueState,
}

/// Drives sessions through the intake dialogue.
///
/// Holds only read-only configuration, so one orchestrator can serve any
/// number of sessions; every session is passed in explicitly.
pub struct Orchestrator {
    knowledge_base: Arc<KnowledgeBase>,
    policy: IntakePolicy,
    classifier: Classifier,
    timer: EscalationTimer,
    synthesizer: Arc<dyn ResponseSynthesizer>,
}

impl Orchestrator {
    /// Create an orchestrator, validating the policy.
    pub fn new(
        knowledge_base: Arc<KnowledgeBase>,
        policy: IntakePolicy,
        synthesizer: Arc<dyn ResponseSynthesizer>,
    ) -> Result<Self, IntakeError> {
        policy.validate()?;
        let classifier = Classifier::new(Arc::clone(&knowledge_base), &policy.cues);
        let timer = EscalationTimer::new(Arc::clone(&knowledge_base), &policy)?;

        Ok(Self {
            knowledge_base,
            policy,
            classifier,
            timer,
            synthesizer,
        })
    }

    /// The shared knowledge base.
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// The validated policy.
    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// The classifier used for routing.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The escalation timer used for emergency windows.
    pub fn timer(&self) -> &EscalationTimer {
        &self.timer
    }

    /// Create a session and greet the caller.
    pub fn start_session(&self, now: DateTime<Utc>) -> Session {
        let mut session = Session::new(now);
        self.greet(&mut session, now);
        session
    }

    /// Emit the greeting if the session has not been greeted yet.
    pub fn greet(&self, session: &mut Session, now: DateTime<Utc>) -> Option<Turn> {
        if session.state() != DialogueState::Greeting {
            return None;
        }
        let turn = self.greeting_turn(session, now);
        session.push_turn(turn.clone());
        Some(turn)
    }

    /// Handle one caller input using the current time.
    pub async fn respond(&self, session: &mut Session, raw_input: &str) -> Result<TurnOutcome, IntakeError> {
        self.respond_at(session, raw_input, Utc::now()).await
    }

    /// Handle one caller input at `now`.
    ///
    /// Fails with `InvalidTransition` if the session has a synthesis in
    /// flight through [`Orchestrator::respond_shared`], and with
    /// `SynthesisUnavailable` if the synthesizer fails; history is unchanged
    /// in both cases.
    pub async fn respond_at(
        &self,
        session: &mut Session,
        raw_input: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome, IntakeError> {
        ensure_idle(session)?;

        if let Some(action) = self.route(session, raw_input, now) {
            return Ok(self.commit_scripted(session, raw_input, action, now));
        }

        let reply = self
            .synthesize(session.id(), session.history(), raw_input)
            .await?;
        Ok(self.commit_synthesized(session, raw_input, reply, now))
    }

    /// Handle one caller input for a shared session.
    ///
    /// The lock is released while the synthesizer runs; input arriving in
    /// that time is rejected with `InvalidTransition`.
    pub async fn respond_shared(
        &self,
        handle: &SessionHandle,
        raw_input: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome, IntakeError> {
        let (id, history) = {
            let mut session = lock_session(handle);
            ensure_idle(&session)?;

            if let Some(action) = self.route(&session, raw_input, now) {
                return Ok(self.commit_scripted(&mut session, raw_input, action, now));
            }

            session.set_awaiting_synthesis(true);
            (session.id(), session.history().to_vec())
        };

        let mut in_flight = InFlight::new(handle);
        let result = self.synthesize(id, &history, raw_input).await;

        let mut session = lock_session(handle);
        in_flight.disarm();
        session.set_awaiting_synthesis(false);
        let reply = result?;
        Ok(self.commit_synthesized(&mut session, raw_input, reply, now))
    }

    /// Deliver the pending guidance if its window has released.
    ///
    /// For layers that poll instead of waiting for caller input.
    pub fn poll_release(&self, session: &mut Session, now: DateTime<Utc>) -> Option<Turn> {
        if session.state() != DialogueState::EmergencyPending {
            return None;
        }
        if !session.window()?.is_released(now) {
            return None;
        }
        let turn = self.release(session, now)?;
        session.push_turn(turn.clone());
        Some(turn)
    }

    /// Wait until the pending window releases, then deliver its guidance.
    pub async fn await_release(&self, session: &mut Session) -> Option<Turn> {
        let window = session.window()?.clone();
        self.timer.wait_for_release(&window, Utc::now()).await;
        self.poll_release(session, Utc::now().max(window.release_at))
    }

    /// Like [`Orchestrator::await_release`] for a shared session.
    ///
    /// The lock is taken only to read the window and to deliver the
    /// guidance, so other turns may be served while this waits.
    pub async fn await_release_shared(&self, handle: &SessionHandle) -> Option<Turn> {
        let window = {
            let session = lock_session(handle);
            session.window()?.clone()
        };
        self.timer.wait_for_release(&window, Utc::now()).await;

        let mut session = lock_session(handle);
        self.poll_release(&mut session, Utc::now().max(window.release_at))
    }

    async fn synthesize(
        &self,
        session: SessionId,
        history: &[Turn],
        raw_input: &str,
    ) -> Result<String, IntakeError> {
        debug!(%session, turns = history.len(), "delegating turn to synthesizer");

        let call = self
            .synthesizer
            .synthesize(history, raw_input, &self.knowledge_base);
        let error = match tokio::time::timeout(self.policy.synthesis_timeout(), call).await {
            Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
            Ok(Ok(_)) => SynthesisError::EmptyResponse,
            Ok(Err(error)) => error,
            Err(_) => SynthesisError::Timeout(self.policy.synthesis_timeout_seconds),
        };

        warn!(%session, %error, "synthesis failed; history left unchanged");
        Err(IntakeError::synthesis_unavailable(session, error))
    }

    fn commit_scripted(
        &self,
        session: &mut Session,
        raw_input: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> TurnOutcome {
        let caller_turn = Turn::caller(raw_input, now);
        session.push_turn(caller_turn.clone());

        let reply = self.apply(session, raw_input, action, now);
        session.push_turn(reply.clone());

        TurnOutcome {
            caller_turn,
            reply,
            state: session.state(),
        }
    }

    fn commit_synthesized(
        &self,
        session: &mut Session,
        raw_input: &str,
        reply: String,
        now: DateTime<Utc>,
    ) -> TurnOutcome {
        let caller_turn = Turn::caller(raw_input, now);
        let reply = Turn::assistant(TurnKind::Synthesized, reply, now);
        session.push_turn(caller_turn.clone());
        session.push_turn(reply.clone());
        session.set_state(DialogueState::Listening);

        TurnOutcome {
            caller_turn,
            reply,
            state: session.state(),
        }
    }

    /// Run a scripted action and build the reply. Does not append it.
    fn apply(&self, session: &mut Session, raw_input: &str, action: Action, now: DateTime<Utc>) -> Turn {
        let id = session.id();

        match action {
            Action::Greet => self.greeting_turn(session, now),
            Action::Escalate(classification) => {
                let outcome = self.timer.arm(session, &classification, now);
                let arrival = self.timer.commit_arrival(session, now);
                session.set_state(DialogueState::EmergencyPending);

                info!(
                    session = %id,
                    categories = ?classification.categories(),
                    release_at = %outcome.window().release_at,
                    eta_minutes = arrival.minutes,
                    "emergency matched; guidance held until release"
                );
                if classification.is_ambiguous() {
                    debug!(session = %id, count = classification.len(), "multiple categories matched");
                }

                let minutes = minutes_phrase(arrival.minutes_remaining(now));
                Turn::assistant(TurnKind::Stall, self.script(&self.policy.scripts.stall, &minutes, ""), now)
            }
            Action::Release => match self.release(session, now) {
                Some(turn) => turn,
                None => self.greeting_turn(session, now),
            },
            Action::Rearm(classification) => {
                match self.timer.arm(session, &classification, now) {
                    ArmOutcome::Merged { added, .. } => {
                        info!(session = %id, added = ?added, "merged categories into pending window");
                    }
                    _ => {
                        debug!(
                            session = %id,
                            categories = ?classification.categories(),
                            "emergency repeated while pending; window unchanged"
                        );
                    }
                }
                self.reassurance_turn(session, now)
            }
            Action::Reassure => self.reassurance_turn(session, now),
            Action::NoteLocation => {
                session.set_caller_location(raw_input.trim());
                debug!(session = %id, "caller location recorded");
                Turn::assistant(
                    TurnKind::LocationNoted,
                    self.script(&self.policy.scripts.location_noted, "", ""),
                    now,
                )
            }
            Action::StayOnLine => Turn::assistant(
                TurnKind::StayOnLine,
                self.script(&self.policy.scripts.stay_on_line, "", ""),
                now,
            ),
            Action::RepeatGuidance => {
                session.set_state(DialogueState::Listening);
                match session.last_guidance().map(str::to_string) {
                    Some(guidance) => {
                        info!(session = %id, "repeating delivered guidance");
                        Turn::assistant(TurnKind::GuidanceRepeat, guidance, now)
                    }
                    None => self.greeting_turn(session, now),
                }
            }
            Action::StartMessage => {
                session.set_state(DialogueState::MessageTaking);
                Turn::assistant(
                    TurnKind::MessagePrompt,
                    self.script(&self.policy.scripts.message_prompt, "", ""),
                    now,
                )
            }
            Action::TakeMessage => {
                let text = raw_input.trim().to_string();
                let confirmation = self.script(&self.policy.scripts.message_confirmation, "", &text);
                session.push_message(TakenMessage { text, taken_at: now });
                session.set_state(DialogueState::Listening);
                info!(session = %id, "message taken");
                Turn::assistant(TurnKind::MessageConfirmation, confirmation, now)
            }
            Action::Close => {
                session.set_state(DialogueState::Closed);
                info!(session = %id, "call closed");
                Turn::assistant(TurnKind::Closing, self.script(&self.policy.scripts.closing, "", ""), now)
            }
            Action::AskDetails => {
                session.set_state(DialogueState::Listening);
                Turn::assistant(
                    TurnKind::DetailsPrompt,
                    self.script(&self.policy.scripts.details_prompt, "", ""),
                    now,
                )
            }
            Action::Clarify => match session.last_assistant_turn().cloned() {
                Some(previous) => {
                    session.set_state(DialogueState::Clarifying);
                    debug!(session = %id, "input unclear; restating previous prompt");
                    Turn::assistant(previous.kind, previous.text, now)
                }
                None => self.greeting_turn(session, now),
            },
        }
    }

    /// Clear a released window and build its guidance turn.
    fn release(&self, session: &mut Session, now: DateTime<Utc>) -> Option<Turn> {
        let window = self.timer.clear(session)?;
        session.set_last_guidance(window.guidance.clone());
        session.set_state(DialogueState::Listening);

        info!(
            session = %session.id(),
            categories = ?window.categories,
            held_for_ms = (now - window.armed_at).num_milliseconds(),
            "guidance released"
        );
        Some(Turn::assistant(TurnKind::Guidance, window.guidance, now))
    }

    fn greeting_turn(&self, session: &mut Session, now: DateTime<Utc>) -> Turn {
        session.set_state(DialogueState::Listening);
        Turn::assistant(TurnKind::Greeting, self.script(&self.policy.scripts.greeting, "", ""), now)
    }

    fn reassurance_turn(&self, session: &mut Session, now: DateTime<Utc>) -> Turn {
        let minutes = minutes_phrase(self.timer.commit_arrival(session, now).minutes_remaining(now));
        Turn::assistant(
            TurnKind::Reassurance,
            self.script(&self.policy.scripts.reassurance, &minutes, ""),
            now,
        )
    }

    fn script(&self, template: &str, minutes: &str, message: &str) -> String {
        render_script(
            template,
            &[
                ("physician", self.policy.physician.as_str()),
                ("minutes", minutes),
                ("message", message),
            ],
        )
    }
}

fn ensure_idle(session: &Session) -> Result<(), IntakeError> {
    if session.is_awaiting_synthesis() {
        return Err(IntakeError::invalid_transition(
            session.id(),
            "a reply is still being prepared for the previous input",
        ));
    }
    Ok(())
}

/// Clears the awaiting-synthesis flag if a shared turn is dropped mid-call.
struct InFlight<'a> {
    handle: &'a SessionHandle,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(handle: &'a SessionHandle) -> Self {
        Self { handle, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock_session(self.handle).set_awaiting_synthesis(false);
        }
    }
}
