//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for listings, transactions, and
//! queue drafts so tests focus on assertions rather than construction
//! boilerplate.

use chrono::Utc;

use crate::domain::{
    ArbitrageListing, BuyerId, Cents, DeliveryPayload, DeliveryRecord, ListingId, ListingRecord,
    PaymentReference, SourcePlatform, TaskDraft, Transaction, TransactionState,
};

/// A raw catalog record. Automated platforms get an endpoint under
/// `https://api.example.test/`.
pub fn listing_record(id: &str, platform: &str, source_cost: Cents) -> ListingRecord {
    let automated = platform
        .parse::<SourcePlatform>()
        .map(|p| p.is_automated())
        .unwrap_or(false);
    ListingRecord {
        id: ListingId::new(id),
        name: format!("{id} service"),
        platform: platform.to_string(),
        source_url: format!("https://{platform}.example.test/{id}"),
        source_cost,
        api_endpoint: automated.then(|| format!("https://api.example.test/{id}")),
        api_method: None,
        credential: None,
        usage_instructions: None,
    }
}

/// A validated listing on `platform`.
pub fn listing(platform: SourcePlatform, source_cost: Cents) -> ArbitrageListing {
    ArbitrageListing::try_from(listing_record("lst", platform.as_str(), source_cost))
        .expect("fixture listing is valid")
}

/// A freshly recorded sale.
pub fn pending_transaction(listing_id: &str, amount_paid: Cents) -> Transaction {
    Transaction::new(
        BuyerId::new("buyer-1"),
        ListingId::new(listing_id),
        PaymentReference::new(format!("pi_{listing_id}")),
        amount_paid,
        serde_json::json!({"prompt": "a red fox"}),
    )
}

/// A sale whose fulfillment already failed, ready for refund.
pub fn failed_transaction(amount_paid: Cents) -> Transaction {
    let mut tx = pending_transaction("broken", amount_paid);
    tx.state = TransactionState::Failed;
    tx.failure_reason = Some("source call failed with status 500".into());
    tx
}

/// Queue draft for a Fiverr sale.
pub fn task_draft(buyer_paid: Cents, source_cost: Cents) -> TaskDraft {
    TaskDraft::snapshot(
        &pending_transaction("gig", buyer_paid),
        &listing(SourcePlatform::Fiverr, source_cost),
    )
}

/// A text delivery, as an operator would submit it.
pub fn manual_delivery() -> DeliveryRecord {
    DeliveryRecord::manual(
        DeliveryPayload::TextResult {
            body: "logo attached".into(),
        },
        None,
        Utc::now(),
    )
    .expect("text results are valid manual deliveries")
}
