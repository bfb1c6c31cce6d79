//! External collaborator seams for partdesk.
//!
//! The vector retrieval service, order metadata store, and chat language
//! model are opaque network services in production. Each is modeled here
//! as an object-safe async trait plus an in-memory implementation used by
//! tests and demos, along with the metadata-filter and search-request
//! types shared with the conversational core.

pub mod error;
pub mod filter;
pub mod llm;
pub mod orders;
pub mod retriever;

pub use error::RetrievalError;
pub use filter::{MatchPredicate, MetadataFilter};
pub use llm::{ChatModel, ScriptedModel};
pub use orders::{InMemoryOrderStore, OrderItem, OrderRecord, OrderStatus, OrderStore};
pub use retriever::{InMemoryRetriever, Namespace, Retriever, ScoredDocument, SearchRequest};
