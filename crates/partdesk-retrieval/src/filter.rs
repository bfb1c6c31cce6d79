//! Metadata filters for similarity search.
//!
//! A filter is built fresh each turn from the resolved entities and rendered
//! into the vector store's `$eq`/`$in` query shape. It is scoped to the
//! search request that carries it and is never cached or mutated afterwards.

use serde_json::{json, Map, Value};

/// Match predicate applied to one metadata field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchPredicate {
    /// Field value must equal the given string.
    Equals(String),
    /// Field value (or any element of an array-valued field) must be one of
    /// the given strings.
    OneOf(Vec<String>),
}

/// Ordered mapping from metadata field name to a match predicate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    fields: Vec<(String, MatchPredicate)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate on `field`.
    pub fn equals(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields
            .push((field.to_string(), MatchPredicate::Equals(value.into())));
        self
    }

    /// Add a membership predicate on `field`.
    pub fn one_of(mut self, field: &str, values: Vec<String>) -> Self {
        self.fields
            .push((field.to_string(), MatchPredicate::OneOf(values)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[(String, MatchPredicate)] {
        &self.fields
    }

    /// Predicate registered for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&MatchPredicate> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, pred)| pred)
    }

    /// Render the `{"field": {"$eq": ..}}` / `{"field": {"$in": [..]}}`
    /// query shape the vector store expects.
    pub fn to_query(&self) -> Value {
        let mut map = Map::new();
        for (field, pred) in &self.fields {
            let clause = match pred {
                MatchPredicate::Equals(v) => json!({ "$eq": v }),
                MatchPredicate::OneOf(vs) => json!({ "$in": vs }),
            };
            map.insert(field.clone(), clause);
        }
        Value::Object(map)
    }

    /// Whether a document's metadata satisfies every predicate.
    ///
    /// An empty filter matches everything. `OneOf` accepts either a string
    /// field whose value is in the list, or an array field with at least one
    /// element in the list.
    pub fn matches(&self, metadata: &Value) -> bool {
        self.fields.iter().all(|(field, pred)| {
            let Some(actual) = metadata.get(field) else {
                return false;
            };
            match pred {
                MatchPredicate::Equals(expected) => {
                    actual.as_str() == Some(expected.as_str())
                }
                MatchPredicate::OneOf(allowed) => match actual {
                    Value::String(s) => allowed.iter().any(|v| v == s),
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| item.as_str())
                        .any(|item| allowed.iter().any(|v| v == item)),
                    _ => false,
                },
            }
        })
    }
}
