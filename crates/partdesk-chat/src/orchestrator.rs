//! Turn orchestrator.
//!
//! One call per incoming message: resolve entities against session
//! context, route, dispatch, and hand back a typed outcome together with
//! the session identifier.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use partdesk_core::PartdeskConfig;
use partdesk_retrieval::{ChatModel, OrderStore, Retriever};

use crate::dispatch::Dispatcher;
use crate::router;
use crate::session::{self, InMemorySessionStore, SessionStore};
use crate::types::TurnOutcome;

/// Coordinates the session store, router, and dispatcher for each turn.
pub struct TurnOrchestrator {
    sessions: Arc<dyn SessionStore>,
    dispatcher: Dispatcher,
}

impl TurnOrchestrator {
    pub fn new(sessions: Arc<dyn SessionStore>, dispatcher: Dispatcher) -> Self {
        Self {
            sessions,
            dispatcher,
        }
    }

    /// Wire an orchestrator from configuration and collaborator handles,
    /// with an in-memory session store honoring the configured TTL.
    pub fn from_config(
        config: &PartdeskConfig,
        retriever: Arc<dyn Retriever>,
        orders: Arc<dyn OrderStore>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let sessions: Arc<dyn SessionStore> = if config.session.ttl_minutes == 0 {
            Arc::new(InMemorySessionStore::new())
        } else {
            Arc::new(InMemorySessionStore::with_ttl(Duration::from_secs(
                u64::from(config.session.ttl_minutes) * 60,
            )))
        };
        let dispatcher = Dispatcher::new(retriever, orders, model, config.retrieval.top_k);
        Self::new(sessions, dispatcher)
    }

    /// Handle one conversational turn.
    ///
    /// A missing `session_id` starts a new session; clients echo the
    /// returned id back to keep the thread. The outcome is typed: faults
    /// from external collaborators come back as `TurnOutcome::Failed`, and
    /// any context written before the fault is kept. Turns are never
    /// retried here.
    pub async fn handle_turn(
        &self,
        session_id: Option<Uuid>,
        message: &str,
    ) -> (Uuid, TurnOutcome) {
        let sid = session_id.unwrap_or_else(Uuid::new_v4);

        // Entity resolution runs exactly once per turn: it both reads the
        // session context and writes this turn's mentions back into it.
        let entities = match session::resolve(self.sessions.as_ref(), sid, message) {
            Ok(entities) => entities,
            Err(err) => {
                error!(session = %sid, error = %err, "Entity resolution failed");
                return (sid, TurnOutcome::Failed(err));
            }
        };

        let intent = router::route(message, Some(&entities.context));
        info!(
            session = %sid,
            intent = %intent,
            part = ?entities.part,
            model = ?entities.model,
            order = ?entities.order,
            "Handling turn"
        );

        match self.dispatcher.dispatch(intent, &entities, message).await {
            Ok(answer) => (sid, TurnOutcome::Answer(answer)),
            Err(err) => {
                error!(session = %sid, intent = %intent, error = %err, "Turn failed");
                (sid, TurnOutcome::Failed(err))
            }
        }
    }
}
