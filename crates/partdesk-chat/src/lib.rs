//! Conversational core for the partdesk assistant.
//!
//! Routes each user message to semantic retrieval or deterministic order
//! operations, resolving follow-up references ("this part", "this order")
//! through per-session context carried across turns.

pub mod dispatch;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod policy;
pub mod router;
pub mod session;
pub mod types;

pub use dispatch::{products_filter, Dispatcher, CLARIFY_ORDER_ID, ORDER_NOT_FOUND};
pub use error::ChatError;
pub use extract::{extract_entities, ExtractedEntities};
pub use orchestrator::TurnOrchestrator;
pub use policy::PolicyTable;
pub use router::{route, rules, Intent, RouteInput, RoutingRule};
pub use session::{resolve, InMemorySessionStore, SessionContext, SessionStore};
pub use types::{ResolvedEntities, TurnOutcome};
