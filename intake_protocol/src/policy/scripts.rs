//! Scripted assistant lines.
//!
//! Lines may reference `{physician}`, `{minutes}` and `{message}`; the
//! orchestrator fills them with [`render_script`]. `{minutes}` expands to a
//! full phrase from [`minutes_phrase`], such as "12 minutes" or "1 minute".

use serde::{Deserialize, Serialize};

/// Fixed lines spoken by the assistant outside of synthesized replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scripts {
    /// Opening question on first contact (and after a reopened call).
    pub greeting: String,

    /// First reply to a matched emergency while guidance is held back.
    pub stall: String,

    /// Reply to impatience while guidance is held back.
    pub reassurance: String,

    /// Acknowledges the location the caller gave during the stall.
    pub location_noted: String,

    /// Reply to a closing cue while guidance is held back.
    pub stay_on_line: String,

    /// Asks for details when the caller reports an emergency without specifics.
    pub details_prompt: String,

    pub message_prompt: String,

    pub message_confirmation: String,

    pub closing: String,
}

impl Default for Scripts {
    fn default() -> Self {
        Self {
            greeting: "Hello, you've reached {physician}'s office. Is this an emergency, or would you like to leave a message?".to_string(),
            stall: "Please hold while I confirm the best course of action. While I check, can you tell me your exact location? {physician} is on the way and should arrive in about {minutes}.".to_string(),
            reassurance: "I understand, and help is on the way. {physician} should arrive in about {minutes}. Please stay on the line while I confirm the right steps for you.".to_string(),
            location_noted: "Thank you, I've noted your location. Please stay with the person while I confirm the best course of action.".to_string(),
            stay_on_line: "Please don't hang up yet. I'm confirming the steps you need to take right now.".to_string(),
            details_prompt: "I'm here to help. Please tell me exactly what is happening.".to_string(),
            message_prompt: "Of course. What message would you like me to pass on to {physician}?".to_string(),
            message_confirmation: "Thank you. I'll make sure {physician} receives your message: \"{message}\". Is there anything else I can help you with?".to_string(),
            closing: "Thank you for calling. Take care, and don't hesitate to call back if you need anything.".to_string(),
        }
    }
}

/// Count of minutes as spoken, e.g. "1 minute" or "12 minutes".
pub fn minutes_phrase(minutes: u32) -> String {
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

/// Replace `{name}` placeholders with values. Unknown placeholders are left as is.
pub fn render_script(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_script() {
        let scripts = Scripts::default();
        let line = render_script(
            &scripts.stall,
            &[("physician", "Dr. Adrin"), ("minutes", minutes_phrase(12).as_str())],
        );

        assert!(line.contains("Dr. Adrin is on the way"));
        assert!(line.contains("about 12 minutes"));
        assert!(!line.contains('{'));
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render_script("Hi {caller}", &[("physician", "X")]), "Hi {caller}");
    }

    #[test]
    fn test_minutes_phrase() {
        assert_eq!(minutes_phrase(1), "1 minute");
        assert_eq!(minutes_phrase(12), "12 minutes");

        let line = render_script(&Scripts::default().reassurance, &[("minutes", minutes_phrase(1).as_str())]);
        assert!(line.contains("about 1 minute."));
        assert!(!line.contains("1 minutes"));
    }

    #[test]
    fn test_partial_scripts_fill_defaults() {
        let scripts: Scripts = toml::from_str(r#"greeting = "Clinic, how can I help?""#).unwrap();
        assert_eq!(scripts.greeting, "Clinic, how can I help?");
        assert_eq!(scripts.closing, Scripts::default().closing);
    }
}
