//! Dispatch of routed turns.
//!
//! Executes whatever a routed intent calls for: a static policy answer, a
//! deterministic order operation against the order store, or a filtered
//! similarity search summarized by the model. Search requests are built
//! fresh per turn; nothing here holds mutable per-session state.

use std::sync::Arc;

use tracing::{debug, info};

use partdesk_core::normalize;
use partdesk_retrieval::{
    ChatModel, MetadataFilter, Namespace, OrderItem, OrderRecord, OrderStatus, OrderStore,
    Retriever, ScoredDocument, SearchRequest,
};

use crate::error::ChatError;
use crate::policy::PolicyTable;
use crate::router::Intent;
use crate::types::ResolvedEntities;

/// Asked when an order operation arrives without any resolvable order ID.
pub const CLARIFY_ORDER_ID: &str =
    "To help with your order, please provide your Order ID (e.g., PSO1234).";

/// Negative answer for a valid-looking but unknown order ID.
pub const ORDER_NOT_FOUND: &str = "Order not found.";

/// Build the products-namespace filter for a turn.
///
/// A resolved part number filters by exact normalized match; otherwise a
/// resolved model filters by membership in the compatible-models set;
/// otherwise the search runs broad.
pub fn products_filter(part: Option<&str>, model: Option<&str>) -> Option<MetadataFilter> {
    if let Some(part) = part {
        Some(MetadataFilter::new().equals("part_number_norm", normalize(part)))
    } else {
        model.map(|model| {
            MetadataFilter::new().one_of("compatible_models_norm", vec![normalize(model)])
        })
    }
}

/// Executes routed intents against the external collaborators.
pub struct Dispatcher {
    retriever: Arc<dyn Retriever>,
    orders: Arc<dyn OrderStore>,
    model: Arc<dyn ChatModel>,
    policies: PolicyTable,
    top_k: usize,
}

impl Dispatcher {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        orders: Arc<dyn OrderStore>,
        model: Arc<dyn ChatModel>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            orders,
            model,
            policies: PolicyTable::new(),
            top_k,
        }
    }

    /// Produce the answer for one routed turn.
    pub async fn dispatch(
        &self,
        intent: Intent,
        entities: &ResolvedEntities,
        message: &str,
    ) -> Result<String, ChatError> {
        match intent {
            Intent::TransactionsPolicy => self.dispatch_policy(message).await,
            Intent::TransactionsOrder => self.dispatch_order(entities, message).await,
            Intent::Products => self.dispatch_products(entities, message).await,
        }
    }

    /// Static table first; on a miss, broad semantic search over the
    /// transactions namespace with no entity filter.
    async fn dispatch_policy(&self, message: &str) -> Result<String, ChatError> {
        if let Some(answer) = self.policies.lookup(message) {
            debug!("Policy table hit");
            return Ok(answer.to_string());
        }
        let request = SearchRequest::new(Namespace::Transactions, message, None, self.top_k);
        self.search_and_summarize(request, message).await
    }

    async fn dispatch_order(
        &self,
        entities: &ResolvedEntities,
        message: &str,
    ) -> Result<String, ChatError> {
        let order = entities
            .order
            .clone()
            .or_else(|| entities.context.active_order.clone());
        let Some(order) = order else {
            return Ok(CLARIFY_ORDER_ID.to_string());
        };
        let order_norm = normalize(&order);
        let msg = message.to_lowercase();

        if contains_any(&msg, &["status", "track", "tracking"]) {
            match self.orders.lookup(&order_norm).await? {
                Some(record) => Ok(status_summary(&record)),
                None => Ok(ORDER_NOT_FOUND.to_string()),
            }
        } else if msg.contains("cancel") {
            match self.orders.lookup(&order_norm).await? {
                Some(record) if record.status == OrderStatus::OrderPlaced => Ok(format!(
                    "Order {} cancellation request submitted.",
                    record.order_id
                )),
                Some(record) => Ok(format!(
                    "Order {} cannot be cancelled because status is '{}'.",
                    record.order_id,
                    record.status.as_str()
                )),
                None => Ok(ORDER_NOT_FOUND.to_string()),
            }
        } else if contains_any(&msg, &["return", "refund", "exchange"]) {
            match self.orders.lookup(&order_norm).await? {
                Some(record) => Ok(return_summary(&record)),
                None => Ok(ORDER_NOT_FOUND.to_string()),
            }
        } else {
            // No action keyword: hand the record and the question to the
            // model and pass its answer through verbatim.
            match self.orders.lookup(&order_norm).await? {
                Some(record) => {
                    let prompt = order_question_prompt(&record, message);
                    Ok(self.model.complete(&prompt).await?)
                }
                None => Ok(ORDER_NOT_FOUND.to_string()),
            }
        }
    }

    async fn dispatch_products(
        &self,
        entities: &ResolvedEntities,
        message: &str,
    ) -> Result<String, ChatError> {
        let filter = products_filter(entities.part.as_deref(), entities.model.as_deref());
        let request = SearchRequest::new(Namespace::Products, message, filter, self.top_k);
        self.search_and_summarize(request, message).await
    }

    async fn search_and_summarize(
        &self,
        request: SearchRequest,
        question: &str,
    ) -> Result<String, ChatError> {
        let documents = self.retriever.search(&request).await?;
        info!(
            namespace = %request.namespace,
            hits = documents.len(),
            filtered = request.filter.is_some(),
            "Similarity search complete"
        );
        let prompt = retrieval_prompt(&documents, question);
        Ok(self.model.complete(&prompt).await?)
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// "Your order PSO1121 is currently shipped with UPS. ..."
fn status_summary(record: &OrderRecord) -> String {
    format!(
        "Your order {} is currently {} with {}. It's heading to {}. Items in this order: {}.",
        record.order_id,
        record.status.phrase(),
        record.carrier,
        record.address_city,
        format_items(&record.items)
    )
}

fn return_summary(record: &OrderRecord) -> String {
    format!(
        "I have initiated a return for order {}. A label from {} will be sent to you. \
         Items affected: {}.",
        record.order_id,
        record.carrier,
        format_items(&record.items)
    )
}

/// "no items listed" / "1 x PS123" / "1 x A, 2 x B, and 1 x C".
fn format_items(items: &[OrderItem]) -> String {
    if items.is_empty() {
        return "no items listed".to_string();
    }
    let parts: Vec<String> = items
        .iter()
        .map(|item| format!("{} x {}", item.qty, item.part_number))
        .collect();
    if parts.len() == 1 {
        return parts[0].clone();
    }
    format!(
        "{}, and {}",
        parts[..parts.len() - 1].join(", "),
        parts[parts.len() - 1]
    )
}

/// Render an order record and the customer's question for the model.
fn order_question_prompt(record: &OrderRecord, question: &str) -> String {
    format!(
        "Answer the customer's question using this order record.\n\n\
         Order ID: {}\n\
         Customer ID: {}\n\
         Created: {}\n\
         Status: {}\n\
         Carrier: {}\n\
         Items: {}\n\
         Address City: {}\n\n\
         Question: {}",
        record.order_id,
        record.customer_id,
        record.created,
        record.status.as_str(),
        record.carrier,
        format_items(&record.items),
        record.address_city,
        question
    )
}

/// Render retrieved documents (content plus metadata fields) and the
/// question for the model.
fn retrieval_prompt(documents: &[ScoredDocument], question: &str) -> String {
    let mut prompt = String::from("Answer the question using the retrieved documents.\n\n");
    for document in documents {
        prompt.push_str("Content: ");
        prompt.push_str(&document.content);
        prompt.push('\n');
        if let Some(fields) = document.metadata.as_object() {
            for (key, value) in fields {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                prompt.push_str(key);
                prompt.push_str(": ");
                prompt.push_str(&rendered);
                prompt.push('\n');
            }
        }
        prompt.push('\n');
    }
    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    use partdesk_retrieval::{
        InMemoryOrderStore, InMemoryRetriever, RetrievalError, ScriptedModel,
    };

    use crate::session::SessionContext;

    fn order(order_id: &str, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: order_id.to_string(),
            customer_id: "C-204".to_string(),
            created: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            status,
            carrier: "UPS".to_string(),
            items: vec![
                OrderItem {
                    part_number: "PS8694830".to_string(),
                    qty: 1,
                },
                OrderItem {
                    part_number: "PS2375646".to_string(),
                    qty: 2,
                },
            ],
            address_city: "Chicago".to_string(),
        }
    }

    fn entities(
        part: Option<&str>,
        model: Option<&str>,
        order_id: Option<&str>,
    ) -> ResolvedEntities {
        ResolvedEntities {
            part: part.map(String::from),
            model: model.map(String::from),
            order: order_id.map(String::from),
            context: SessionContext::default(),
        }
    }

    /// Retriever wrapper that counts calls, for asserting a path made no
    /// search.
    struct CountingRetriever {
        inner: InMemoryRetriever,
        calls: AtomicUsize,
    }

    impl CountingRetriever {
        fn new(inner: InMemoryRetriever) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Retriever for CountingRetriever {
        async fn search(
            &self,
            request: &SearchRequest,
        ) -> Result<Vec<ScoredDocument>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.search(request).await
        }
    }

    fn dispatcher_with(
        retriever: Arc<dyn Retriever>,
        orders: InMemoryOrderStore,
        model: ScriptedModel,
    ) -> Dispatcher {
        Dispatcher::new(retriever, Arc::new(orders), Arc::new(model), 10)
    }

    // ---- products_filter ----

    #[test]
    fn test_products_filter_part_wins() {
        let filter = products_filter(Some("PS2375646"), Some("WDT780SAEM1")).unwrap();
        assert_eq!(
            filter.get("part_number_norm"),
            Some(&partdesk_retrieval::MatchPredicate::Equals(
                "ps2375646".to_string()
            ))
        );
        assert_eq!(filter.get("compatible_models_norm"), None);
    }

    #[test]
    fn test_products_filter_model_fallback() {
        let filter = products_filter(None, Some("WDT780SAEM1")).unwrap();
        assert_eq!(
            filter.get("compatible_models_norm"),
            Some(&partdesk_retrieval::MatchPredicate::OneOf(vec![
                "wdt780saem1".to_string()
            ]))
        );
    }

    #[test]
    fn test_products_filter_none_is_broad() {
        assert_eq!(products_filter(None, None), None);
    }

    // ---- Policy intent ----

    #[tokio::test]
    async fn test_policy_table_hit_makes_no_retrieval_call() {
        let counting = Arc::new(CountingRetriever::new(InMemoryRetriever::new()));
        let dispatcher = dispatcher_with(
            counting.clone(),
            InMemoryOrderStore::new(),
            ScriptedModel::canned("should not be used"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsPolicy,
                &entities(None, None, None),
                "What is your return policy?",
            )
            .await
            .unwrap();

        assert_eq!(answer, crate::policy::RETURN_POLICY);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_policy_miss_falls_back_to_unfiltered_search() {
        let mut retriever = InMemoryRetriever::new();
        retriever.insert(
            Namespace::Transactions,
            "Orders ship within two business days of payment",
            json!({ "order_id_norm": "pso1121" }),
        );
        let counting = Arc::new(CountingRetriever::new(retriever));
        let dispatcher = dispatcher_with(
            counting.clone(),
            InMemoryOrderStore::new(),
            ScriptedModel::echo(),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsPolicy,
                // Even a resolved part must not filter the policy fallback.
                &entities(Some("PS8694830"), None, None),
                "do you have a price-match policy?",
            )
            .await
            .unwrap();

        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        // The echoed prompt carries the retrieved document and the question.
        assert!(answer.contains("two business days"));
        assert!(answer.contains("price-match policy"));
    }

    // ---- Order intent: clarification ----

    #[tokio::test]
    async fn test_order_without_id_asks_for_one() {
        let store = InMemoryOrderStore::new();
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            store,
            ScriptedModel::canned("unused"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, None),
                "where is my order?",
            )
            .await
            .unwrap();
        assert_eq!(answer, CLARIFY_ORDER_ID);
    }

    #[tokio::test]
    async fn test_order_id_from_context_when_turn_has_none() {
        let mut store = InMemoryOrderStore::new();
        store.insert(order("PSO1121", OrderStatus::Shipped));
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            store,
            ScriptedModel::canned("unused"),
        );

        let mut resolved = entities(None, None, None);
        resolved.context.active_order = Some("pso1121".to_string());

        let answer = dispatcher
            .dispatch(Intent::TransactionsOrder, &resolved, "what's the status?")
            .await
            .unwrap();
        assert!(answer.starts_with("Your order PSO1121 is currently shipped with UPS."));
    }

    // ---- Order intent: status ----

    #[tokio::test]
    async fn test_status_summary_answer() {
        let mut store = InMemoryOrderStore::new();
        store.insert(order("PSO1121", OrderStatus::OutForDelivery));
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            store,
            ScriptedModel::canned("unused"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO1121")),
                "track order PSO1121",
            )
            .await
            .unwrap();
        assert_eq!(
            answer,
            "Your order PSO1121 is currently out for delivery with UPS. It's heading to \
             Chicago. Items in this order: 1 x PS8694830, and 2 x PS2375646."
        );
    }

    #[tokio::test]
    async fn test_status_unknown_order_not_found() {
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            InMemoryOrderStore::new(),
            ScriptedModel::canned("unused"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO9999")),
                "status of PSO9999",
            )
            .await
            .unwrap();
        assert_eq!(answer, ORDER_NOT_FOUND);
    }

    // ---- Order intent: cancel ----

    #[tokio::test]
    async fn test_cancel_order_placed_submits() {
        let mut store = InMemoryOrderStore::new();
        store.insert(order("PSO1050", OrderStatus::OrderPlaced));
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            store,
            ScriptedModel::canned("unused"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO1050")),
                "cancel order PSO1050",
            )
            .await
            .unwrap();
        assert_eq!(answer, "Order PSO1050 cancellation request submitted.");
    }

    #[tokio::test]
    async fn test_cancel_shipped_names_current_status() {
        let mut store = InMemoryOrderStore::new();
        store.insert(order("PSO1050", OrderStatus::Shipped));
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            store,
            ScriptedModel::canned("unused"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO1050")),
                "cancel order PSO1050",
            )
            .await
            .unwrap();
        assert_eq!(
            answer,
            "Order PSO1050 cannot be cancelled because status is 'shipped'."
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_order_not_found() {
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            InMemoryOrderStore::new(),
            ScriptedModel::canned("unused"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO9999")),
                "cancel PSO9999",
            )
            .await
            .unwrap();
        assert_eq!(answer, ORDER_NOT_FOUND);
    }

    // ---- Order intent: return ----

    #[tokio::test]
    async fn test_return_initiated_answer() {
        let mut store = InMemoryOrderStore::new();
        store.insert(order("PSO1121", OrderStatus::Delivered));
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            store,
            ScriptedModel::canned("unused"),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO1121")),
                "I want a refund for PSO1121",
            )
            .await
            .unwrap();
        assert_eq!(
            answer,
            "I have initiated a return for order PSO1121. A label from UPS will be sent to \
             you. Items affected: 1 x PS8694830, and 2 x PS2375646."
        );
    }

    // ---- Order intent: free-form question to the model ----

    #[tokio::test]
    async fn test_order_question_goes_to_model_with_metadata() {
        let mut store = InMemoryOrderStore::new();
        store.insert(order("PSO1121", OrderStatus::Shipped));
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            store,
            ScriptedModel::echo(),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO1121")),
                "which city is order PSO1121 heading to?",
            )
            .await
            .unwrap();
        // The prompt (echoed back) carries the record fields and question.
        assert!(answer.contains("Order ID: PSO1121"));
        assert!(answer.contains("Carrier: UPS"));
        assert!(answer.contains("Address City: Chicago"));
        assert!(answer.contains("which city is order PSO1121 heading to?"));
    }

    #[tokio::test]
    async fn test_order_question_unknown_order_not_found() {
        let dispatcher = dispatcher_with(
            Arc::new(InMemoryRetriever::new()),
            InMemoryOrderStore::new(),
            ScriptedModel::echo(),
        );

        let answer = dispatcher
            .dispatch(
                Intent::TransactionsOrder,
                &entities(None, None, Some("PSO9999")),
                "what is in order PSO9999",
            )
            .await
            .unwrap();
        assert_eq!(answer, ORDER_NOT_FOUND);
    }

    // ---- Products intent ----

    #[tokio::test]
    async fn test_products_part_filter_selects_exact_document() {
        let mut retriever = InMemoryRetriever::new();
        retriever.insert(
            Namespace::Products,
            "Dishwasher upper rack adjuster kit",
            json!({ "part_number_norm": "ps2375646", "compatible_models_norm": ["wdt780saem1"] }),
        );
        retriever.insert(
            Namespace::Products,
            "Refrigerator door shelf bin",
            json!({ "part_number_norm": "ps8694830", "compatible_models_norm": [] }),
        );
        let dispatcher = dispatcher_with(
            Arc::new(retriever),
            InMemoryOrderStore::new(),
            ScriptedModel::echo(),
        );

        let answer = dispatcher
            .dispatch(
                Intent::Products,
                &entities(Some("PS2375646"), None, None),
                "What model fits part PS2375646?",
            )
            .await
            .unwrap();
        assert!(answer.contains("rack adjuster"));
        assert!(!answer.contains("shelf bin"));
    }

    #[tokio::test]
    async fn test_products_model_filter_on_compatible_models() {
        let mut retriever = InMemoryRetriever::new();
        retriever.insert(
            Namespace::Products,
            "Dishwasher upper rack adjuster kit",
            json!({ "part_number_norm": "ps2375646", "compatible_models_norm": ["wdt780saem1"] }),
        );
        retriever.insert(
            Namespace::Products,
            "Oven igniter assembly",
            json!({ "part_number_norm": "ps5554321", "compatible_models_norm": ["fgid2476sf"] }),
        );
        let dispatcher = dispatcher_with(
            Arc::new(retriever),
            InMemoryOrderStore::new(),
            ScriptedModel::echo(),
        );

        let answer = dispatcher
            .dispatch(
                Intent::Products,
                &entities(None, Some("WDT780SAEM1"), None),
                "what fits WDT780SAEM1",
            )
            .await
            .unwrap();
        assert!(answer.contains("rack adjuster"));
        assert!(!answer.contains("igniter"));
    }

    #[tokio::test]
    async fn test_products_broad_search_without_entities() {
        let mut retriever = InMemoryRetriever::new();
        retriever.insert(
            Namespace::Products,
            "Water filters for most fridge brands",
            json!({ "part_number_norm": "ps1111111" }),
        );
        let counting = Arc::new(CountingRetriever::new(retriever));
        let dispatcher = dispatcher_with(
            counting.clone(),
            InMemoryOrderStore::new(),
            ScriptedModel::echo(),
        );

        let answer = dispatcher
            .dispatch(
                Intent::Products,
                &entities(None, None, None),
                "do you sell water filters",
            )
            .await
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert!(answer.contains("Water filters"));
    }

    // ---- Fault propagation ----

    #[tokio::test]
    async fn test_model_fault_surfaces_as_llm_error() {
        let mut retriever = InMemoryRetriever::new();
        retriever.insert(Namespace::Products, "doc", json!({}));
        let dispatcher = dispatcher_with(
            Arc::new(retriever),
            InMemoryOrderStore::new(),
            ScriptedModel::failing("overloaded"),
        );

        let err = dispatcher
            .dispatch(Intent::Products, &entities(None, None, None), "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
    }

    // ---- Formatting helpers ----

    #[test]
    fn test_format_items_empty() {
        assert_eq!(format_items(&[]), "no items listed");
    }

    #[test]
    fn test_format_items_single() {
        let items = vec![OrderItem {
            part_number: "PS123456".to_string(),
            qty: 1,
        }];
        assert_eq!(format_items(&items), "1 x PS123456");
    }

    #[test]
    fn test_format_items_multiple() {
        let items = vec![
            OrderItem {
                part_number: "A".to_string(),
                qty: 1,
            },
            OrderItem {
                part_number: "B".to_string(),
                qty: 2,
            },
            OrderItem {
                part_number: "C".to_string(),
                qty: 1,
            },
        ];
        assert_eq!(format_items(&items), "1 x A, 2 x B, and 1 x C");
    }
}
