//! # Intake Core
//!
//! The dialogue "brain" of the emergency intake assistant. This crate takes the
//! knowledge base and policy from `intake_protocol`, classifies caller input,
//! holds emergency guidance back until the escalation window releases, and
//! delegates everything off-script to a response synthesizer.
//!
//! ## Core Components
//!
//! - **session**: Per-caller state and the append-only turn history
//! - **classifier**: Emergency category matching and intent cues
//! - **escalation**: Release-time tracking and the arrival estimate
//! - **orchestrator**: The turn-by-turn state machine
//! - **synthesis**: The synthesizer seam and the receptionist prompt
//!
//! ## Design Philosophy
//!
//! - **Caller-Owned State**: A `Session` is a plain value passed in on every turn
//! - **Time as Input**: Every decision takes `now`; nothing sleeps unless asked to
//! - **Never Lose a Turn**: Failures leave history untouched for a resubmit

pub mod classifier;
pub mod error;
pub mod escalation;
pub mod orchestrator;
pub mod session;
pub mod synthesis;

pub use classifier::*;
pub use error::*;
pub use escalation::*;
pub use orchestrator::*;
pub use session::*;
pub use synthesis::*;
