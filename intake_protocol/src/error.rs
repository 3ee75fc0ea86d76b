//! Errors raised while building a protocol.

use thiserror::Error;

/// Errors for invalid knowledge bases, policies and protocol files.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A category key or alias was empty after trimming.
    #[error("empty match term in category '{category}'")]
    EmptyMatchTerm { category: String },

    /// Two categories share the same key.
    #[error("duplicate emergency category '{0}'")]
    DuplicateCategory(String),

    /// A category has no guidance text.
    #[error("category '{0}' has no guidance text")]
    MissingGuidance(String),

    /// Policy values that cannot work together.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// The protocol file could not be read.
    #[error("failed to read protocol file: {0}")]
    Io(#[from] std::io::Error),

    /// The protocol file is not valid TOML for this schema.
    #[error("failed to parse protocol file: {0}")]
    Parse(#[from] toml::de::Error),
}
