//! Similarity-search seam.
//!
//! Production deployments talk to a hosted vector index over the network;
//! `InMemoryRetriever` provides a deterministic stand-in for tests and
//! demos. Requests are built fresh per turn; there is no long-lived,
//! mutable retriever configuration to race on.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::RetrievalError;
use crate::filter::MetadataFilter;

/// Logical partition of the retrieval index, searched independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Product documents (parts, compatibility, install guides).
    Products,
    /// Transaction documents (orders, shipments).
    Transactions,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Products => "products",
            Namespace::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search, fully described: namespace, query text, optional metadata
/// filter, and result count. Constructed per turn from current inputs.
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub namespace: Namespace,
    pub query: String,
    pub filter: Option<MetadataFilter>,
    pub k: usize,
}

impl SearchRequest {
    pub fn new(
        namespace: Namespace,
        query: impl Into<String>,
        filter: Option<MetadataFilter>,
        k: usize,
    ) -> Self {
        Self {
            namespace,
            query: query.into(),
            filter,
            k,
        }
    }
}

/// A similarity-ranked document with its metadata.
#[derive(Clone, Debug)]
pub struct ScoredDocument {
    pub content: String,
    pub metadata: Value,
    pub score: f32,
}

/// The vector retrieval service, as seen by the core.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Similarity search, optionally metadata-filtered, ranked best-first.
    async fn search(&self, request: &SearchRequest)
        -> Result<Vec<ScoredDocument>, RetrievalError>;
}

/// In-memory retriever scoring by query-token overlap.
///
/// Honors [`MetadataFilter`] exactly the way the hosted index does: equals
/// on scalar fields, one-of as membership in array fields. Good enough to
/// exercise every dispatch path without a network.
#[derive(Debug, Default)]
pub struct InMemoryRetriever {
    documents: Vec<(Namespace, String, Value)>,
}

impl InMemoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document into a namespace.
    pub fn insert(&mut self, namespace: Namespace, content: impl Into<String>, metadata: Value) {
        self.documents.push((namespace, content.into(), metadata));
    }

    /// Fraction of query tokens present in the content, case-insensitive.
    fn score(query: &str, content: &str) -> f32 {
        let content_lower = content.to_lowercase();
        let tokens: Vec<&str> = query.split_whitespace().collect();
        if tokens.is_empty() {
            return 0.0;
        }
        let hits = tokens
            .iter()
            .filter(|t| content_lower.contains(&t.to_lowercase()))
            .count();
        hits as f32 / tokens.len() as f32
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let mut results: Vec<ScoredDocument> = self
            .documents
            .iter()
            .filter(|(ns, _, _)| *ns == request.namespace)
            .filter(|(_, _, metadata)| {
                request
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.matches(metadata))
            })
            .map(|(_, content, metadata)| ScoredDocument {
                content: content.clone(),
                metadata: metadata.clone(),
                score: Self::score(&request.query, content),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(request.k);
        debug!(
            namespace = %request.namespace,
            k = request.k,
            hits = results.len(),
            "In-memory search"
        );
        Ok(results)
    }
}
