//! Handler for `arbfill stats`.

use serde_json::json;
use tabled::Tabled;

use super::output;
use crate::domain::{format_cents, StatsSummary, TransactionState};
use crate::error::Result;
use crate::infrastructure::bootstrap::Services;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct PlatformRow {
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Transactions")]
    transactions: u64,
    #[tabled(rename = "Completed")]
    completed: u64,
    #[tabled(rename = "Refunded")]
    refunded: u64,
    #[tabled(rename = "Net Profit")]
    net_profit: String,
}

/// Print aggregate statistics.
pub async fn execute(config: Config) -> Result<()> {
    let services = Services::open(config).await?;
    let summary = services.stats().summary().await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "stats",
            "summary": summary,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    display(&summary);
    Ok(())
}

fn display(s: &StatsSummary) {
    output::section("Transactions");
    output::field("Total", s.total_transactions);
    output::field("Completed", s.count(TransactionState::Completed));
    output::field("Awaiting", s.count(TransactionState::AwaitingManual));
    output::field("Refunded", s.count(TransactionState::Refunded));
    let refund_failed = s.count(TransactionState::RefundFailed);
    if refund_failed > 0 {
        output::field("Refund failed", output::negative(refund_failed));
    }
    output::field(
        "Net profit",
        output::signed(s.total_net_profit, format_cents(s.total_net_profit)),
    );
    if let Some(secs) = s.avg_fulfillment_secs {
        output::field("Avg time", format!("{secs}s"));
    }

    output::section("Manual queue");
    output::field("Pending", s.queue_depth);
    output::field("Completed", s.queue_completed);
    output::field("SLA breaches", s.queue_escalated);

    if !s.by_platform.is_empty() {
        output::section("By platform");
        output::table(s.by_platform.iter().map(|(platform, stats)| PlatformRow {
            platform: platform.to_string(),
            transactions: stats.transactions,
            completed: stats.completed,
            refunded: stats.refunded,
            net_profit: format_cents(stats.net_profit),
        }));
    }
}
