//! Intent routing.
//!
//! A fixed, ordered rule list classifies each message; the first matching
//! rule wins. Order encodes priority, not preference: policy and
//! order-action keywords outrank a bare identifier, which outranks the
//! sticky follow-up on an open order thread.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract;
use crate::session::SessionContext;

/// Task category of one message. Recomputed fresh every turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Products,
    TransactionsPolicy,
    TransactionsOrder,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Products => "products",
            Intent::TransactionsPolicy => "transactions_policy",
            Intent::TransactionsOrder => "transactions_order",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const POLICY_KEYWORDS: &[&str] = &[
    "shipping",
    "delivery",
    "policy",
    "return policy",
    "cancellation policy",
    "cancel policy",
];

const ORDER_KEYWORDS: &[&str] = &[
    "order", "status", "track", "tracking", "cancel", "return", "refund", "exchange", "city",
];

/// Per-message view the routing rules evaluate against.
pub struct RouteInput<'a> {
    text: &'a str,
    lower: String,
    has_active_order: bool,
}

impl<'a> RouteInput<'a> {
    pub fn new(text: &'a str, context: Option<&SessionContext>) -> Self {
        Self {
            text,
            lower: text.to_lowercase(),
            has_active_order: context.is_some_and(|c| c.active_order.is_some()),
        }
    }
}

/// One routing rule: a named predicate and the intent it selects.
pub struct RoutingRule {
    pub name: &'static str,
    pub intent: Intent,
    predicate: fn(&RouteInput) -> bool,
}

impl RoutingRule {
    pub fn matches(&self, input: &RouteInput) -> bool {
        (self.predicate)(input)
    }
}

fn has_policy_keyword(input: &RouteInput) -> bool {
    POLICY_KEYWORDS.iter().any(|k| input.lower.contains(k))
}

fn has_order_keyword(input: &RouteInput) -> bool {
    ORDER_KEYWORDS.iter().any(|k| input.lower.contains(k))
}

fn has_order_id(input: &RouteInput) -> bool {
    extract::extract_order_id(input.text).is_some()
}

fn has_part_or_model(input: &RouteInput) -> bool {
    extract::extract_part_number(input.text).is_some()
        || extract::extract_model_number(input.text).is_some()
}

fn has_active_order(input: &RouteInput) -> bool {
    input.has_active_order
}

fn always(_: &RouteInput) -> bool {
    true
}

static RULES: [RoutingRule; 6] = [
    RoutingRule {
        name: "policy-keyword",
        intent: Intent::TransactionsPolicy,
        predicate: has_policy_keyword,
    },
    RoutingRule {
        name: "order-keyword",
        intent: Intent::TransactionsOrder,
        predicate: has_order_keyword,
    },
    RoutingRule {
        name: "literal-order-id",
        intent: Intent::TransactionsOrder,
        predicate: has_order_id,
    },
    RoutingRule {
        name: "part-or-model",
        intent: Intent::Products,
        predicate: has_part_or_model,
    },
    RoutingRule {
        name: "sticky-order",
        intent: Intent::TransactionsOrder,
        predicate: has_active_order,
    },
    RoutingRule {
        name: "default",
        intent: Intent::Products,
        predicate: always,
    },
];

/// The routing rules in evaluation order.
pub fn rules() -> &'static [RoutingRule] {
    &RULES
}

/// Classify a message, consulting the session context only for the sticky
/// follow-up rule.
pub fn route(text: &str, context: Option<&SessionContext>) -> Intent {
    let input = RouteInput::new(text, context);
    for rule in &RULES {
        if rule.matches(&input) {
            debug!(rule = rule.name, intent = %rule.intent, "Routed message");
            return rule.intent;
        }
    }
    // The last rule always matches; this is unreachable in practice.
    Intent::Products
}
