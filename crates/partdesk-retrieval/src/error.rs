//! Error type for external collaborator calls.

use partdesk_core::PartdeskError;

/// Errors from the external collaborators: the vector search backend, the
/// order metadata store, and the chat language model.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("search backend error: {0}")]
    Search(String),
    #[error("order lookup error: {0}")]
    OrderLookup(String),
    #[error("completion error: {0}")]
    Completion(String),
}

impl From<RetrievalError> for PartdeskError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Search(m) => PartdeskError::Retrieval(m),
            RetrievalError::OrderLookup(m) => PartdeskError::OrderStore(m),
            RetrievalError::Completion(m) => PartdeskError::Llm(m),
        }
    }
}
