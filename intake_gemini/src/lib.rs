//! # Intake Gemini
//!
//! A [`ResponseSynthesizer`](intake_core::ResponseSynthesizer) that renders
//! the receptionist prompt and sends it to Gemini's `generateContent`
//! endpoint.
//!
//! Credentials come from the environment (or a `.env` file), never from the
//! core crates:
//!
//! - `GOOGLE_API_KEY` (required)
//! - `GEMINI_MODEL` (default `gemini-2.5-flash`)
//! - `GEMINI_BASE_URL` (default is the public v1beta models endpoint)

pub mod config;
pub mod synthesizer;

pub use config::*;
pub use synthesizer::*;
