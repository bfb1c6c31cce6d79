//! Order metadata store seam.
//!
//! Orders live in an external system reached over the network; the core
//! only ever performs exact lookups by normalized order ID. The in-memory
//! implementation backs tests and demos.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use partdesk_core::normalize;

use crate::error::RetrievalError;

/// Lifecycle status of an order.
///
/// The wire form mirrors the order system's own strings, which are mostly
/// snake_case with one legacy space-separated value (`out for delivery`).
/// Unknown strings round-trip through `Other` rather than failing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    OrderPlaced,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    ReturnInitiated,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    /// Parse a raw status string; never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "order_placed" => OrderStatus::OrderPlaced,
            "processing" => OrderStatus::Processing,
            "shipped" => OrderStatus::Shipped,
            "out for delivery" => OrderStatus::OutForDelivery,
            "delivered" => OrderStatus::Delivered,
            "return_initiated" => OrderStatus::ReturnInitiated,
            "cancelled" => OrderStatus::Cancelled,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    /// The wire form as stored by the order system.
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::OrderPlaced => "order_placed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out for delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::ReturnInitiated => "return_initiated",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(raw) => raw,
        }
    }

    /// Customer-facing phrase used in order summaries.
    pub fn phrase(&self) -> String {
        match self {
            OrderStatus::OrderPlaced => "placed and awaiting shipment".to_string(),
            OrderStatus::Processing => "being prepared for shipment".to_string(),
            OrderStatus::Shipped => "shipped".to_string(),
            OrderStatus::OutForDelivery => "out for delivery".to_string(),
            OrderStatus::Delivered => "delivered".to_string(),
            OrderStatus::ReturnInitiated => "in return processing".to_string(),
            OrderStatus::Cancelled => "cancelled".to_string(),
            OrderStatus::Other(raw) if raw.is_empty() => "being processed".to_string(),
            OrderStatus::Other(raw) => raw.replace('_', " "),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        OrderStatus::parse(&raw)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

/// One line item on an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub part_number: String,
    pub qty: u32,
}

/// Metadata record for one order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub customer_id: String,
    pub created: NaiveDate,
    pub status: OrderStatus,
    pub carrier: String,
    pub items: Vec<OrderItem>,
    pub address_city: String,
}

/// The external order metadata store, exact-match only.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Look up an order by its *normalized* ID. Absence is `Ok(None)`,
    /// never an error.
    async fn lookup(&self, order_id_norm: &str) -> Result<Option<OrderRecord>, RetrievalError>;
}

/// In-memory order store keyed by normalized order ID.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: HashMap<String, OrderRecord>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order, keyed by the normalized form of its ID.
    pub fn insert(&mut self, record: OrderRecord) {
        self.orders.insert(normalize(&record.order_id), record);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn lookup(&self, order_id_norm: &str) -> Result<Option<OrderRecord>, RetrievalError> {
        Ok(self.orders.get(order_id_norm).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(order_id: &str, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: order_id.to_string(),
            customer_id: "C-204".to_string(),
            created: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            status,
            carrier: "UPS".to_string(),
            items: vec![OrderItem {
                part_number: "PS8694830".to_string(),
                qty: 1,
            }],
            address_city: "Chicago".to_string(),
        }
    }

    // ---- OrderStatus ----

    #[test]
    fn test_status_parse_known_values() {
        assert_eq!(OrderStatus::parse("order_placed"), OrderStatus::OrderPlaced);
        assert_eq!(OrderStatus::parse("shipped"), OrderStatus::Shipped);
        assert_eq!(
            OrderStatus::parse("out for delivery"),
            OrderStatus::OutForDelivery
        );
        assert_eq!(
            OrderStatus::parse("return_initiated"),
            OrderStatus::ReturnInitiated
        );
    }

    #[test]
    fn test_status_parse_is_case_and_whitespace_tolerant() {
        assert_eq!(OrderStatus::parse(" Shipped "), OrderStatus::Shipped);
        assert_eq!(OrderStatus::parse("DELIVERED"), OrderStatus::Delivered);
    }

    #[test]
    fn test_status_parse_unknown_round_trips() {
        let status = OrderStatus::parse("on_hold");
        assert_eq!(status, OrderStatus::Other("on_hold".to_string()));
        assert_eq!(status.as_str(), "on_hold");
    }

    #[test]
    fn test_status_phrase() {
        assert_eq!(
            OrderStatus::OrderPlaced.phrase(),
            "placed and awaiting shipment"
        );
        assert_eq!(
            OrderStatus::Processing.phrase(),
            "being prepared for shipment"
        );
        assert_eq!(
            OrderStatus::ReturnInitiated.phrase(),
            "in return processing"
        );
        assert_eq!(
            OrderStatus::Other("on_hold".to_string()).phrase(),
            "on hold"
        );
        assert_eq!(
            OrderStatus::Other(String::new()).phrase(),
            "being processed"
        );
    }

    #[test]
    fn test_status_serde_round_trip() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out for delivery\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::OutForDelivery);
    }

    // ---- InMemoryOrderStore ----

    #[tokio::test]
    async fn test_lookup_by_normalized_id() {
        let mut store = InMemoryOrderStore::new();
        store.insert(record("PSO1121", OrderStatus::Shipped));

        let found = store.lookup("pso1121").await.unwrap();
        assert_eq!(found.unwrap().order_id, "PSO1121");
    }

    #[tokio::test]
    async fn test_lookup_is_exact_on_normalized_form() {
        let mut store = InMemoryOrderStore::new();
        store.insert(record("PSO1121", OrderStatus::Shipped));

        // The store expects the caller to normalize first; a raw uppercase
        // ID is not a key.
        assert!(store.lookup("PSO1121").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_missing_is_none_not_error() {
        let store = InMemoryOrderStore::new();
        assert!(store.lookup("pso9999").await.unwrap().is_none());
    }
}
