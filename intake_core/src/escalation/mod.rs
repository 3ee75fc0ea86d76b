//! Escalation timer - holds emergency guidance back until a release time.
//!
//! The timer works in four steps:
//! 1. **Arm**: An emergency match opens a window ending `stall` after `now`
//! 2. **Hold**: While `remaining_delay > 0` the guidance stays with the window
//! 3. **Release**: Once the delay reaches zero the guidance may be surfaced
//! 4. **Clear**: Delivering the guidance removes the window
//!
//! A session has at most one window. A second match while it is pending
//! follows the [`RearmPolicy`]; the release time never moves.

mod arrival;

pub use arrival::*;

use chrono::{DateTime, Utc};
use intake_protocol::{
    ArrivalWindow, EmergencyCategory, IntakePolicy, KnowledgeBase, ProtocolError, RearmPolicy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::Classification;
use crate::session::Session;

/// The interval during which matched guidance is withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationWindow {
    pub armed_at: DateTime<Utc>,
    pub release_at: DateTime<Utc>,
    /// Matched categories in knowledge-base order.
    pub categories: Vec<EmergencyCategory>,
    /// Guidance fixed when the window was armed (or merged).
    pub guidance: String,
}

impl EscalationWindow {
    /// Time left before the guidance may be surfaced; zero once released.
    pub fn remaining_delay(&self, now: DateTime<Utc>) -> Duration {
        (self.release_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// True once `release_at` has been reached.
    pub fn is_released(&self, now: DateTime<Utc>) -> bool {
        self.remaining_delay(now).is_zero()
    }
}

/// Result of arming the timer for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A new window was opened.
    Armed(EscalationWindow),
    /// A window was already pending and was left unchanged.
    AlreadyPending(EscalationWindow),
    /// New categories were folded into the pending window.
    Merged {
        window: EscalationWindow,
        added: Vec<EmergencyCategory>,
    },
}

impl ArmOutcome {
    /// The session's window after arming.
    pub fn window(&self) -> &EscalationWindow {
        match self {
            ArmOutcome::Armed(window) | ArmOutcome::AlreadyPending(window) => window,
            ArmOutcome::Merged { window, .. } => window,
        }
    }

    /// True when a new window was opened.
    pub fn is_new(&self) -> bool {
        matches!(self, ArmOutcome::Armed(_))
    }
}

/// Arms, checks and clears escalation windows, and commits arrival estimates.
#[derive(Debug, Clone)]
pub struct EscalationTimer {
    knowledge_base: Arc<KnowledgeBase>,
    stall: chrono::Duration,
    rearm: RearmPolicy,
    arrival: ArrivalWindow,
}

impl EscalationTimer {
    /// Create a timer from the policy's stall, re-arm and arrival settings.
    pub fn new(
        knowledge_base: Arc<KnowledgeBase>,
        policy: &IntakePolicy,
    ) -> Result<Self, ProtocolError> {
        let stall = chrono::Duration::from_std(policy.stall_duration()).map_err(|_| {
            ProtocolError::InvalidPolicy(format!(
                "stall of {} seconds is out of range",
                policy.stall_seconds
            ))
        })?;

        Ok(Self {
            knowledge_base,
            stall,
            rearm: policy.rearm,
            arrival: policy.arrival,
        })
    }

    /// Open a window for the matched categories, or apply the re-arm policy
    /// when one is already pending.
    pub fn arm(
        &self,
        session: &mut Session,
        classification: &Classification,
        now: DateTime<Utc>,
    ) -> ArmOutcome {
        if let Some(window) = session.window_mut() {
            if self.rearm == RearmPolicy::Ignore {
                return ArmOutcome::AlreadyPending(window.clone());
            }

            let added: Vec<_> = classification
                .categories()
                .iter()
                .filter(|category| !window.categories.contains(category))
                .cloned()
                .collect();
            if added.is_empty() {
                return ArmOutcome::AlreadyPending(window.clone());
            }

            window.categories.extend(added.iter().cloned());
            window
                .categories
                .sort_by_key(|category| self.knowledge_base.position(category).unwrap_or(usize::MAX));
            window.guidance = self.knowledge_base.combined_guidance(&window.categories);

            return ArmOutcome::Merged {
                window: window.clone(),
                added,
            };
        }

        let categories = classification.categories().to_vec();
        let window = EscalationWindow {
            armed_at: now,
            release_at: now + self.stall,
            guidance: self.knowledge_base.combined_guidance(&categories),
            categories,
        };
        session.set_window(window.clone());
        ArmOutcome::Armed(window)
    }

    /// Time left on a window; zero once `release_at` has passed.
    pub fn remaining_delay(&self, window: &EscalationWindow, now: DateTime<Utc>) -> Duration {
        window.remaining_delay(now)
    }

    /// Remove the session's window after its guidance was delivered.
    pub fn clear(&self, session: &mut Session) -> Option<EscalationWindow> {
        session.take_window()
    }

    /// Suspend until the window releases.
    pub async fn wait_for_release(&self, window: &EscalationWindow, now: DateTime<Utc>) {
        let remaining = window.remaining_delay(now);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }

    /// The session's arrival estimate. A new one is committed on first use
    /// and after the previous one has lapsed.
    pub fn commit_arrival(&self, session: &mut Session, now: DateTime<Utc>) -> ArrivalEstimate {
        if let Some(existing) = session.arrival().filter(|estimate| !estimate.is_lapsed(now)) {
            return *existing;
        }
        let estimate = ArrivalEstimate::sample(&self.arrival, now, &mut rand::thread_rng());
        session.set_arrival(estimate);
        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use intake_protocol::Cues;

    fn setup(policy: IntakePolicy) -> (EscalationTimer, Classifier) {
        let base = Arc::new(KnowledgeBase::reference());
        let timer = EscalationTimer::new(Arc::clone(&base), &policy).unwrap();
        let classifier = Classifier::new(base, &Cues::default());
        (timer, classifier)
    }

    #[test]
    fn test_arm_sets_release_time() {
        let (timer, classifier) = setup(IntakePolicy::reference());
        let now = Utc::now();
        let mut session = Session::new(now);

        let outcome = timer.arm(&mut session, &classifier.classify("I can't breathe"), now);

        assert!(outcome.is_new());
        let window = outcome.window();
        assert_eq!(window.release_at - window.armed_at, chrono::Duration::seconds(15));
        assert_eq!(
            Some(window.guidance.as_str()),
            KnowledgeBase::reference().lookup("not breathing")
        );
        assert_eq!(session.window(), Some(window));
    }

    #[test]
    fn test_remaining_delay_decreases_to_zero() {
        let (timer, classifier) = setup(IntakePolicy::reference());
        let now = Utc::now();
        let mut session = Session::new(now);

        let window = timer
            .arm(&mut session, &classifier.classify("chest pain"), now)
            .window()
            .clone();

        let mut previous = timer.remaining_delay(&window, now);
        assert_eq!(previous, Duration::from_secs(15));
        for second in 1..15 {
            let remaining = timer.remaining_delay(&window, now + chrono::Duration::seconds(second));
            assert!(remaining < previous);
            previous = remaining;
        }

        assert_eq!(
            timer.remaining_delay(&window, now + chrono::Duration::seconds(15)),
            Duration::ZERO
        );
        assert_eq!(
            timer.remaining_delay(&window, now + chrono::Duration::seconds(90)),
            Duration::ZERO
        );
        assert!(window.is_released(now + chrono::Duration::seconds(16)));
    }

    #[test]
    fn test_ignore_policy_keeps_window() {
        let (timer, classifier) = setup(IntakePolicy::reference());
        let now = Utc::now();
        let mut session = Session::new(now);

        let first = timer
            .arm(&mut session, &classifier.classify("chest pain"), now)
            .window()
            .clone();
        let second = timer.arm(
            &mut session,
            &classifier.classify("now he passed out"),
            now + chrono::Duration::seconds(5),
        );

        assert!(matches!(&second, ArmOutcome::AlreadyPending(w) if *w == first));
        assert_eq!(session.window(), Some(&first));
    }

    #[test]
    fn test_merge_policy_adds_guidance_without_extending() {
        let (timer, classifier) = setup(IntakePolicy::reference().with_rearm(RearmPolicy::Merge));
        let now = Utc::now();
        let mut session = Session::new(now);

        let first = timer
            .arm(&mut session, &classifier.classify("he passed out"), now)
            .window()
            .clone();
        let merged = timer.arm(
            &mut session,
            &classifier.classify("and there is severe bleeding"),
            now + chrono::Duration::seconds(5),
        );

        match merged {
            ArmOutcome::Merged { window, added } => {
                assert_eq!(added, vec![EmergencyCategory::new("severe bleeding")]);
                assert_eq!(window.release_at, first.release_at);
                assert_eq!(
                    window.categories,
                    vec![
                        EmergencyCategory::new("severe bleeding"),
                        EmergencyCategory::new("unconscious")
                    ]
                );
                assert!(window.guidance.starts_with("Apply direct pressure"));
                assert!(window.guidance.ends_with("start CPR immediately."));
            }
            other => panic!("expected merge, got {other:?}"),
        }

        let repeat = timer.arm(&mut session, &classifier.classify("unconscious"), now);
        assert!(matches!(repeat, ArmOutcome::AlreadyPending(_)));
    }

    #[test]
    fn test_clear_removes_window() {
        let (timer, classifier) = setup(IntakePolicy::reference());
        let now = Utc::now();
        let mut session = Session::new(now);

        timer.arm(&mut session, &classifier.classify("anaphylaxis"), now);
        assert!(timer.clear(&mut session).is_some());
        assert!(session.window().is_none());
        assert!(timer.clear(&mut session).is_none());
    }

    #[test]
    fn test_commit_arrival_once() {
        let policy = IntakePolicy::reference().with_arrival(ArrivalWindow::new(5, 20));
        let (timer, _) = setup(policy);
        let now = Utc::now();
        let mut session = Session::new(now);

        let first = timer.commit_arrival(&mut session, now);
        let again = timer.commit_arrival(&mut session, now + chrono::Duration::minutes(3));

        assert!(ArrivalWindow::new(5, 20).contains(first.minutes));
        assert_eq!(first, again);
        assert_eq!(session.arrival(), Some(&first));
    }

    #[test]
    fn test_commit_arrival_after_lapse() {
        let (timer, _) = setup(IntakePolicy::reference());
        let now = Utc::now();
        let mut session = Session::new(now);

        let first = timer.commit_arrival(&mut session, now);
        let later = now + chrono::Duration::hours(2);
        let fresh = timer.commit_arrival(&mut session, later);

        assert!(first.is_lapsed(later));
        assert_eq!(fresh.committed_at, later);
        assert!(!fresh.is_lapsed(later));
        assert!(fresh.minutes_remaining(later) >= 5);
        assert_eq!(session.arrival(), Some(&fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_release_sleeps_remaining() {
        let (timer, classifier) = setup(IntakePolicy::reference());
        let now = Utc::now();
        let mut session = Session::new(now);
        let window = timer
            .arm(&mut session, &classifier.classify("chest pain"), now)
            .window()
            .clone();

        let started = tokio::time::Instant::now();
        timer.wait_for_release(&window, now).await;
        assert!(started.elapsed() >= Duration::from_secs(15));
    }
}
