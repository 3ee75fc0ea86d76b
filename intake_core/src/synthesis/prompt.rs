//! Receptionist prompt - renders history, input and knowledge into one prompt.

use intake_protocol::{ArrivalWindow, IntakePolicy, KnowledgeBase};
use serde::{Deserialize, Serialize};

use crate::session::{Role, Turn};

/// Builds the text prompt a synthesizer sends to its model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionistPrompt {
    pub physician: String,
    pub arrival: ArrivalWindow,
}

impl ReceptionistPrompt {
    /// Create a prompt builder for a physician and arrival window.
    pub fn new(physician: impl Into<String>, arrival: ArrivalWindow) -> Self {
        Self {
            physician: physician.into(),
            arrival,
        }
    }

    /// Create a prompt builder from the policy's physician and arrival window.
    pub fn from_policy(policy: &IntakePolicy) -> Self {
        Self::new(policy.physician.clone(), policy.arrival)
    }

    /// Format the full prompt.
    pub fn render(&self, history: &[Turn], raw_input: &str, knowledge_base: &KnowledgeBase) -> String {
        let mut prompt = String::new();

        prompt.push_str("## Role\n");
        prompt.push_str(&format!(
            "You are the receptionist for {}. You handle emergency calls and messages.\n\n",
            self.physician
        ));

        prompt.push_str("## Instructions\n");
        for (number, line) in self.instructions().iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", number + 1, line));
        }
        prompt.push_str(
            "Always keep a caring and professional tone. Your first duty is to help in emergencies and make sure messages are passed on.\n\n",
        );

        prompt.push_str("## Emergency Responses\n");
        for entry in knowledge_base.entries() {
            prompt.push_str(&format!("- {}: {}\n", entry.category, entry.guidance));
        }
        prompt.push('\n');

        prompt.push_str("## Conversation So Far\n");
        if history.is_empty() {
            prompt.push_str("(none)\n");
        }
        for turn in history {
            prompt.push_str(&format!("{}: {}\n", speaker(turn.role), turn.text));
        }
        prompt.push('\n');

        prompt.push_str(&format!("{}: {}\n", speaker(Role::Caller), raw_input));
        prompt.push_str(&format!("{}:", speaker(Role::Assistant)));

        prompt
    }

    fn instructions(&self) -> Vec<String> {
        vec![
            "First, confirm whether the caller has an emergency or wants to leave a message.".to_string(),
            "For a message, ask for the message. For an emergency, ask for details about the emergency.".to_string(),
            "For emergencies, give the immediate next steps from the emergency responses below.".to_string(),
            "While checking the emergency response, ask for the caller's location.".to_string(),
            format!(
                "Give an estimated time of arrival for {} between {} and {} minutes.",
                self.physician, self.arrival.min_minutes, self.arrival.max_minutes
            ),
            "If the caller says the arrival will be too late, repeat the emergency response and encourage them to follow the steps.".to_string(),
            format!("For messages, confirm that the message will be forwarded to {}.", self.physician),
            "If the caller says something unrelated, say that you don't understand and repeat the last question or statement.".to_string(),
        ]
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::Caller => "Caller",
        Role::Assistant => "Receptionist",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TurnKind;
    use chrono::Utc;

    #[test]
    fn test_prompt_sections() {
        let now = Utc::now();
        let history = vec![
            Turn::assistant(TurnKind::Greeting, "Is this an emergency?", now),
            Turn::caller("Not really", now),
        ];
        let prompt = ReceptionistPrompt::from_policy(&IntakePolicy::reference()).render(
            &history,
            "Are you open on Sunday?",
            &KnowledgeBase::reference(),
        );

        assert!(prompt.contains("receptionist for Dr. Adrin"));
        assert!(prompt.contains("between 5 and 20 minutes"));
        assert!(prompt.contains("- chest pain: Have the person sit down"));
        assert!(prompt.contains("Receptionist: Is this an emergency?\nCaller: Not really\n"));
        assert!(prompt.ends_with("Caller: Are you open on Sunday?\nReceptionist:"));
    }

    #[test]
    fn test_prompt_with_empty_history() {
        let prompt = ReceptionistPrompt::new("Dr. Osei", ArrivalWindow::new(10, 15)).render(
            &[],
            "hello",
            &KnowledgeBase::new(),
        );

        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("between 10 and 15 minutes"));
        assert!(prompt.contains("forwarded to Dr. Osei"));
    }
}
