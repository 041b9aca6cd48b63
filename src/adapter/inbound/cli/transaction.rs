//! Handlers for `record`, `process`, `status`, `refund`, and `fail`.

use serde_json::json;

use super::command::{FailArgs, RecordArgs, RefundArgs, TransactionArg};
use super::output;
use crate::application::{FulfillmentStatus, NewSale, ProcessOutcome};
use crate::domain::{format_cents, BuyerId, ListingId, PaymentReference, Transaction};
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::Services;
use crate::infrastructure::config::settings::Config;

/// Register a captured payment.
pub async fn record(config: Config, args: RecordArgs) -> Result<()> {
    let input: serde_json::Value = serde_json::from_str(&args.input)
        .map_err(|e| Error::Parse(format!("--input is not valid JSON: {e}")))?;
    let services = Services::open(config).await?;
    let router = services.router()?;

    let tx = router
        .record(NewSale {
            buyer: BuyerId::new(args.buyer),
            listing: ListingId::new(args.listing),
            payment_reference: PaymentReference::new(args.payment),
            amount_paid: args.amount,
            input,
        })
        .await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "record",
            "transaction": tx,
        }));
        return Ok(());
    }

    output::success(&format!("Recorded transaction {}", tx.id));
    output::field("Listing", &tx.listing);
    output::field("Amount", format_cents(tx.amount_paid));
    output::note(&format!("Fulfill it with `arbfill process {}`", tx.id));
    Ok(())
}

/// Fulfill a pending transaction.
pub async fn process(config: Config, args: &TransactionArg) -> Result<()> {
    let services = Services::open(config).await?;
    let router = services.router()?;
    let outcome = router.process(args.id).await?;

    if output::is_json() {
        output::json_output(outcome_json(&outcome));
        return Ok(());
    }

    match &outcome {
        ProcessOutcome::Completed(tx) => {
            output::success(&format!("Transaction {} completed", tx.id));
            show_profit(tx);
        }
        ProcessOutcome::AwaitingManual { transaction, task } => {
            output::success(&format!(
                "Transaction {} queued as task {}",
                transaction.id, task.task_number
            ));
            output::field("Platform", task.platform);
            output::field("Source", output::highlight(&task.source_url));
        }
        ProcessOutcome::Refunded {
            transaction,
            code,
            reason,
        } => {
            output::warning(&format!(
                "Transaction {} failed ({code}) and was refunded",
                transaction.id
            ));
            output::field("Reason", reason);
            if let Some(reference) = &transaction.refund_reference {
                output::field("Refund", reference);
            }
        }
    }
    Ok(())
}

fn outcome_json(outcome: &ProcessOutcome) -> serde_json::Value {
    match outcome {
        ProcessOutcome::Completed(tx) => json!({
            "command": "process",
            "outcome": "completed",
            "transaction": tx,
        }),
        ProcessOutcome::AwaitingManual { transaction, task } => json!({
            "command": "process",
            "outcome": "awaiting_manual",
            "transaction": transaction,
            "task": task,
        }),
        ProcessOutcome::Refunded {
            transaction,
            code,
            reason,
        } => json!({
            "command": "process",
            "outcome": "refunded",
            "transaction": transaction,
            "code": code,
            "reason": reason,
        }),
    }
}

fn show_profit(tx: &Transaction) {
    if let Some(profit) = &tx.profit {
        output::field(
            "Net profit",
            output::signed(profit.net_profit, format_cents(profit.net_profit)),
        );
        output::field("Margin", format!("{}%", profit.margin_percent));
    }
}

/// Buyer-facing status. Does not need the catalog.
pub async fn status(config: Config, args: &TransactionArg) -> Result<()> {
    let services = Services::open(config).await?;
    let tx = services
        .store
        .get(args.id)
        .await?
        .ok_or(crate::error::FulfillmentError::TransactionNotFound(args.id))?;
    let status = FulfillmentStatus::from(&tx);

    if output::is_json() {
        output::json_output(json!({
            "command": "status",
            "status": status,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("Transaction {}", status.transaction_id));
    output::field("State", output::highlight(status.state));
    output::field("Paid", format_cents(status.amount_paid));
    if let Some(platform) = status.source_platform {
        output::field("Platform", platform);
    }
    if let Some(task) = status.task_number {
        output::field("Manual task", task);
    }
    if let Some(delivery) = &status.delivery {
        output::field("Delivered", delivery.payload.summary());
    }
    if let Some(reason) = &status.failure_reason {
        output::field("Failure", output::negative(reason));
    }
    if let Some(reference) = &status.refund_reference {
        output::field("Refund", reference);
    }
    output::field("Created", status.created_at.to_rfc3339());
    output::field("Updated", status.updated_at.to_rfc3339());
    if let Some(at) = status.completed_at {
        output::field("Completed", at.to_rfc3339());
    }
    show_profit(&tx);
    Ok(())
}

/// Cancel and refund, or finish a refund that never started or was cut off.
pub async fn refund(config: Config, args: RefundArgs) -> Result<()> {
    let services = Services::open(config).await?;
    let router = services.router()?;
    let tx = router.refund(args.id, args.reason).await?;
    show_refunded("refund", &tx);
    Ok(())
}

/// Fail a stale `PROCESSING` transaction and refund it.
pub async fn fail(config: Config, args: FailArgs) -> Result<()> {
    let services = Services::open(config).await?;
    let router = services.router()?;
    let tx = router.fail(args.id, args.reason).await?;
    show_refunded("fail", &tx);
    Ok(())
}

fn show_refunded(command: &str, tx: &Transaction) {
    if output::is_json() {
        output::json_output(json!({
            "command": command,
            "transaction": tx,
        }));
        return;
    }

    output::success(&format!("Transaction {} refunded", tx.id));
    if let Some(reference) = &tx.refund_reference {
        output::field("Refund", reference);
    }
}
