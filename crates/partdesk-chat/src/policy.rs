//! Static policy answers.
//!
//! A small ordered table consulted before any retrieval call. The first
//! entry whose key appears in the lower-cased message wins, so table order
//! is part of the contract.

pub const RETURN_POLICY: &str = "You can return most items within 30 days of delivery. \
    Please visit our Returns page for details.";

pub const CANCELLATION_POLICY: &str = "You can cancel your order within 5 hours of placing it. \
    Orders that are out for delivery/shipped cannot be cancelled. \
    Please visit our Cancellations page for details.";

pub const SHIPPING_POLICY: &str = "Shipping times and costs vary by location, however, \
    we offer free shipping on orders over $50. Standard shipping takes 3-5 business days. \
    Please visit our Shipping page for details.";

static ENTRIES: &[(&str, &str)] = &[
    ("return policy", RETURN_POLICY),
    ("cancellation policy", CANCELLATION_POLICY),
    ("shipping policy", SHIPPING_POLICY),
];

/// Fixed keyword-to-answer table for policy questions.
#[derive(Debug, Default)]
pub struct PolicyTable;

impl PolicyTable {
    pub fn new() -> Self {
        Self
    }

    /// First entry whose key is a substring of the lower-cased message.
    pub fn lookup(&self, message: &str) -> Option<&'static str> {
        let lower = message.to_lowercase();
        ENTRIES
            .iter()
            .find(|(key, _)| lower.contains(key))
            .map(|(_, answer)| *answer)
    }
}
