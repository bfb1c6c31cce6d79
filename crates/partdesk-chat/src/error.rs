//! Error types for the conversational core.

use partdesk_core::PartdeskError;
use partdesk_retrieval::RetrievalError;

/// External-collaborator faults surfaced by a turn.
///
/// Missing entities and not-found lookups are *not* errors; they become
/// normal answers. Only genuine faults in the session store, search
/// backend, order store, or model land here.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session store error: {0}")]
    Session(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("order store error: {0}")]
    OrderStore(String),
    #[error("LLM error: {0}")]
    Llm(String),
}

impl From<RetrievalError> for ChatError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Search(m) => ChatError::Retrieval(m),
            RetrievalError::OrderLookup(m) => ChatError::OrderStore(m),
            RetrievalError::Completion(m) => ChatError::Llm(m),
        }
    }
}

impl From<ChatError> for PartdeskError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Session(m) => PartdeskError::Session(m),
            ChatError::Retrieval(m) => PartdeskError::Retrieval(m),
            ChatError::OrderStore(m) => PartdeskError::OrderStore(m),
            ChatError::Llm(m) => PartdeskError::Llm(m),
        }
    }
}
