//! # Intake Protocol
//!
//! The "Protocol Bible" crate - the emergency knowledge base, the intake policy
//! (stall duration, arrival window, scripted lines, intent cues) and the TOML
//! loader that builds both. This crate holds data only and does not contain
//! any dialogue logic.

pub mod error;
pub mod knowledge_base;
pub mod loader;
pub mod policy;

pub use error::*;
pub use knowledge_base::*;
pub use loader::*;
pub use policy::*;
