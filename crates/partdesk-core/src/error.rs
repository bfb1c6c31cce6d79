use thiserror::Error;

/// Top-level error type for the partdesk system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for
/// PartdeskError` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PartdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Order store error: {0}")]
    OrderStore(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PartdeskError {
    fn from(err: toml::de::Error) -> Self {
        PartdeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PartdeskError {
    fn from(err: toml::ser::Error) -> Self {
        PartdeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PartdeskError {
    fn from(err: serde_json::Error) -> Self {
        PartdeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for partdesk operations.
pub type Result<T> = std::result::Result<T, PartdeskError>;
