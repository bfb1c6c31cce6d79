//! Chat language model seam.
//!
//! The model is an opaque collaborator: it takes a fully rendered prompt
//! and returns text. `ScriptedModel` covers tests without a network.

use async_trait::async_trait;

use crate::error::RetrievalError;

/// The chat-completion model, as seen by the core.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate an answer for a fully rendered prompt.
    async fn complete(&self, prompt: &str) -> Result<String, RetrievalError>;
}

enum Script {
    /// Return the prompt verbatim, so tests can assert on what reached the
    /// model.
    Echo,
    /// Return a fixed answer.
    Canned(String),
    /// Fail every call with the given message.
    Fail(String),
}

/// Deterministic model double for tests and demos.
pub struct ScriptedModel {
    script: Script,
}

impl ScriptedModel {
    /// A model that echoes its prompt back.
    pub fn echo() -> Self {
        Self {
            script: Script::Echo,
        }
    }

    /// A model that always returns `answer`.
    pub fn canned(answer: impl Into<String>) -> Self {
        Self {
            script: Script::Canned(answer.into()),
        }
    }

    /// A model whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Script::Fail(message.into()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, RetrievalError> {
        match &self.script {
            Script::Echo => Ok(prompt.to_string()),
            Script::Canned(answer) => Ok(answer.clone()),
            Script::Fail(message) => Err(RetrievalError::Completion(message.clone())),
        }
    }
}
