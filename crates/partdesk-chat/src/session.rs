//! Per-session conversational context.
//!
//! Each session carries the most recently mentioned part, model, and order
//! in normalized form so short follow-ups ("this part", "this order") can
//! be resolved without restating the identifier. Contexts are owned by a
//! [`SessionStore`]; everything else reads and writes them only through
//! [`resolve`], once per turn.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use partdesk_core::normalize;

use crate::error::ChatError;
use crate::extract;
use crate::types::ResolvedEntities;

/// The sticky entities of one session.
///
/// Fields hold normalized identifiers. They are only ever overwritten with
/// a newly mentioned value; nothing clears them while the session lives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub active_part: Option<String>,
    pub active_model: Option<String>,
    pub active_order: Option<String>,
}

/// Storage abstraction over session contexts.
///
/// The in-memory implementation below serves tests and single-instance
/// deployments; a shared external store can be swapped in behind the same
/// trait for multi-instance setups.
pub trait SessionStore: Send + Sync {
    /// Snapshot of a session's context, if it exists.
    fn get(&self, session_id: Uuid) -> Result<Option<SessionContext>, ChatError>;

    /// Fetch-or-create the context, apply `f`, store the result, and
    /// return the updated snapshot.
    fn upsert(
        &self,
        session_id: Uuid,
        f: &mut dyn FnMut(&mut SessionContext),
    ) -> Result<SessionContext, ChatError>;

    /// Drop a session's context.
    fn clear(&self, session_id: Uuid) -> Result<(), ChatError>;
}

struct Entry {
    context: SessionContext,
    touched: Instant,
}

/// In-memory session store with optional idle expiry.
///
/// A zero TTL disables expiry; contexts then live for the process
/// lifetime. Expired entries are dropped lazily on access.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    /// Store without expiry.
    pub fn new() -> Self {
        Self::with_ttl(Duration::ZERO)
    }

    /// Store that evicts contexts idle for longer than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        !self.ttl.is_zero() && entry.touched.elapsed() > self.ttl
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session_id: Uuid) -> Result<Option<SessionContext>, ChatError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ChatError::Session(format!("session lock poisoned: {}", e)))?;
        if let Some(entry) = sessions.get(&session_id) {
            if self.is_expired(entry) {
                sessions.remove(&session_id);
                return Ok(None);
            }
            return Ok(Some(entry.context.clone()));
        }
        Ok(None)
    }

    fn upsert(
        &self,
        session_id: Uuid,
        f: &mut dyn FnMut(&mut SessionContext),
    ) -> Result<SessionContext, ChatError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ChatError::Session(format!("session lock poisoned: {}", e)))?;

        let entry = sessions.entry(session_id).or_insert_with(|| Entry {
            context: SessionContext::default(),
            touched: Instant::now(),
        });
        if self.is_expired(entry) {
            entry.context = SessionContext::default();
        }
        f(&mut entry.context);
        entry.touched = Instant::now();
        Ok(entry.context.clone())
    }

    fn clear(&self, session_id: Uuid) -> Result<(), ChatError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ChatError::Session(format!("session lock poisoned: {}", e)))?;
        sessions.remove(&session_id);
        Ok(())
    }
}

/// Resolve the turn's entities against stored context, then fold newly
/// mentioned identifiers back into it.
///
/// Steps, in order:
/// 1. run all three extractors on the text;
/// 2. fetch-or-create the session's context;
/// 3. with no part extracted, "this part" pulls in `active_part`;
/// 4. with no order extracted, "this order" pulls in `active_order`;
/// 5. every resolved identifier is normalized and written back to its
///    `active_*` field, the only place context is mutated.
///
/// Call this exactly once per turn. It both reads and writes the session
/// record; a second call would re-apply the fallback substitution against
/// the freshly overwritten context and can lose fallback values.
pub fn resolve(
    store: &dyn SessionStore,
    session_id: Uuid,
    text: &str,
) -> Result<ResolvedEntities, ChatError> {
    let extracted = extract::extract_entities(text);
    let lower = text.to_lowercase();

    let mut part = extracted.part_number;
    let model = extracted.model_number;
    let mut order = extracted.order_id;

    let context = store.upsert(session_id, &mut |ctx| {
        if part.is_none() && lower.contains("this part") {
            part = ctx.active_part.clone();
        }
        if order.is_none() && lower.contains("this order") {
            order = ctx.active_order.clone();
        }

        if let Some(p) = &part {
            ctx.active_part = Some(normalize(p));
        }
        if let Some(m) = &model {
            ctx.active_model = Some(normalize(m));
        }
        if let Some(o) = &order {
            ctx.active_order = Some(normalize(o));
        }
    })?;

    Ok(ResolvedEntities {
        part,
        model,
        order,
        context,
    })
}
