//! Routing - picks the next assistant action from the state and the input.

use chrono::{DateTime, Utc};

use super::Orchestrator;
use crate::classifier::{is_unreadable, Classification, IntentSignals};
use crate::session::{DialogueState, Session};

/// What the assistant does with one caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Greet,
    /// New emergency: arm the window and stall.
    Escalate(Classification),
    /// The window has released: deliver its guidance.
    Release,
    /// Another emergency while one is pending: apply the re-arm policy.
    Rearm(Classification),
    Reassure,
    NoteLocation,
    StayOnLine,
    RepeatGuidance,
    StartMessage,
    TakeMessage,
    Close,
    AskDetails,
    Clarify,
}

impl Orchestrator {
    /// Pick the scripted action for this input, or `None` to hand the turn
    /// to the synthesizer.
    pub(crate) fn route(&self, session: &Session, raw_input: &str, now: DateTime<Utc>) -> Option<Action> {
        let classification = self.classifier.classify(raw_input);
        let signals = self.classifier.detect_intent(raw_input);

        let action = match session.state() {
            DialogueState::EmergencyPending => match session.window() {
                Some(window) if window.is_released(now) => Action::Release,
                Some(_) => route_pending(session, raw_input, classification, signals),
                None => return route_listening(session, raw_input, classification, signals),
            },
            DialogueState::MessageTaking => {
                if !classification.is_empty() {
                    Action::Escalate(classification)
                } else if signals.closing_only {
                    Action::Close
                } else if is_unreadable(raw_input) {
                    Action::Clarify
                } else {
                    Action::TakeMessage
                }
            }
            DialogueState::Greeting | DialogueState::Closed => {
                if !classification.is_empty() {
                    Action::Escalate(classification)
                } else if signals.message {
                    Action::StartMessage
                } else {
                    Action::Greet
                }
            }
            DialogueState::Listening | DialogueState::Clarifying => {
                return route_listening(session, raw_input, classification, signals)
            }
        };
        Some(action)
    }
}

/// Open conversation. Only input that fits no script is delegated.
fn route_listening(
    session: &Session,
    raw_input: &str,
    classification: Classification,
    signals: IntentSignals,
) -> Option<Action> {
    if !classification.is_empty() {
        return Some(Action::Escalate(classification));
    }
    if signals.message {
        return Some(Action::StartMessage);
    }
    if signals.closing {
        return Some(Action::Close);
    }
    if signals.impatience && session.last_guidance().is_some() {
        return Some(Action::RepeatGuidance);
    }
    if signals.emergency {
        return Some(Action::AskDetails);
    }
    if is_unreadable(raw_input) {
        return Some(Action::Clarify);
    }

    let awaiting_choice = session
        .last_assistant_turn()
        .is_some_and(|turn| turn.kind.is_closed_question());
    awaiting_choice.then_some(Action::Clarify)
}

/// Input while guidance is still held back. Never reaches the synthesizer.
fn route_pending(
    session: &Session,
    raw_input: &str,
    classification: Classification,
    signals: IntentSignals,
) -> Action {
    if !classification.is_empty() {
        Action::Rearm(classification)
    } else if signals.impatience {
        Action::Reassure
    } else if signals.closing {
        Action::StayOnLine
    } else if session.caller_location().is_none() && !is_unreadable(raw_input) {
        Action::NoteLocation
    } else {
        Action::Reassure
    }
}
