//! Intake policy - timing, arrival window, scripted lines and intent cues.

mod cues;
mod scripts;

pub use cues::*;
pub use scripts::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ProtocolError;

/// Longest stall a policy may ask for.
pub const MAX_STALL_SECONDS: u64 = 3600;

/// What happens when another emergency is matched while guidance is pending.
///
/// Neither option moves the release time of the pending window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// Keep the pending window exactly as armed.
    #[default]
    Ignore,
    /// Add the new categories' guidance to the pending window.
    Merge,
}

/// Bounds for the promised arrival time, in whole minutes (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalWindow {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl ArrivalWindow {
    /// Create a window from inclusive minute bounds.
    pub fn new(min_minutes: u32, max_minutes: u32) -> Self {
        Self {
            min_minutes,
            max_minutes,
        }
    }

    /// Check whether an estimate falls inside the window.
    pub fn contains(&self, minutes: u32) -> bool {
        (self.min_minutes..=self.max_minutes).contains(&minutes)
    }
}

impl Default for ArrivalWindow {
    fn default() -> Self {
        Self::new(5, 20)
    }
}

/// Everything the dialogue needs besides the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakePolicy {
    /// Minimum time between an emergency match and its guidance.
    pub stall_seconds: u64,

    /// Upper bound on a single synthesizer call.
    pub synthesis_timeout_seconds: u64,

    pub rearm: RearmPolicy,

    pub arrival: ArrivalWindow,

    /// Name used in scripted lines ("{physician}").
    pub physician: String,

    pub scripts: Scripts,

    pub cues: Cues,
}

impl IntakePolicy {
    /// The reference policy: 15 second stall, 5-20 minute arrival window.
    pub fn reference() -> Self {
        Self::default()
    }

    /// Set the stall before guidance is released.
    pub fn with_stall_seconds(mut self, seconds: u64) -> Self {
        self.stall_seconds = seconds;
        self
    }

    /// Set how a second emergency during a stall is handled.
    pub fn with_rearm(mut self, rearm: RearmPolicy) -> Self {
        self.rearm = rearm;
        self
    }

    /// Set the window arrival estimates are drawn from.
    pub fn with_arrival(mut self, arrival: ArrivalWindow) -> Self {
        self.arrival = arrival;
        self
    }

    /// Set how long a synthesizer call may take.
    pub fn with_synthesis_timeout_seconds(mut self, seconds: u64) -> Self {
        self.synthesis_timeout_seconds = seconds;
        self
    }

    /// Set the physician named in scripted lines.
    pub fn with_physician(mut self, physician: impl Into<String>) -> Self {
        self.physician = physician.into();
        self
    }

    /// The stall as a duration.
    pub fn stall_duration(&self) -> Duration {
        Duration::from_secs(self.stall_seconds)
    }

    /// The synthesis timeout as a duration.
    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_seconds)
    }

    /// Check that the values can work together.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.stall_seconds > MAX_STALL_SECONDS {
            return Err(ProtocolError::InvalidPolicy(format!(
                "stall of {} seconds exceeds the {MAX_STALL_SECONDS} second limit",
                self.stall_seconds
            )));
        }
        if self.arrival.min_minutes == 0 || self.arrival.min_minutes > self.arrival.max_minutes {
            return Err(ProtocolError::InvalidPolicy(format!(
                "arrival window {}-{} minutes is empty or starts at zero",
                self.arrival.min_minutes, self.arrival.max_minutes
            )));
        }
        if self.synthesis_timeout_seconds == 0 {
            return Err(ProtocolError::InvalidPolicy(
                "synthesis timeout must be at least one second".to_string(),
            ));
        }
        if self.physician.trim().is_empty() {
            return Err(ProtocolError::InvalidPolicy(
                "physician name is empty".to_string(),
            ));
        }
        self.cues.validate()
    }
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            stall_seconds: 15,
            synthesis_timeout_seconds: 30,
            rearm: RearmPolicy::Ignore,
            arrival: ArrivalWindow::default(),
            physician: "Dr. Adrin".to_string(),
            scripts: Scripts::default(),
            cues: Cues::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_policy() {
        let policy = IntakePolicy::reference();
        assert_eq!(policy.stall_duration(), Duration::from_secs(15));
        assert_eq!(policy.rearm, RearmPolicy::Ignore);
        assert_eq!(policy.arrival, ArrivalWindow::new(5, 20));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_arrival_window_contains() {
        let window = ArrivalWindow::new(5, 20);
        assert!(window.contains(5));
        assert!(window.contains(20));
        assert!(!window.contains(4));
        assert!(!window.contains(21));
    }

    #[test]
    fn test_invalid_policies() {
        let inverted = IntakePolicy::reference().with_arrival(ArrivalWindow::new(10, 5));
        assert!(matches!(inverted.validate(), Err(ProtocolError::InvalidPolicy(_))));

        let no_timeout = IntakePolicy::reference().with_synthesis_timeout_seconds(0);
        assert!(no_timeout.validate().is_err());

        let nameless = IntakePolicy::reference().with_physician("  ");
        assert!(nameless.validate().is_err());

        let endless = IntakePolicy::reference().with_stall_seconds(MAX_STALL_SECONDS + 1);
        assert!(endless.validate().is_err());
    }
}
