//! Statistics domain types.
//!
//! Aggregates computed read-only from transaction and task history.

use std::collections::BTreeMap;

use serde::Serialize;

use super::money::Cents;
use super::platform::SourcePlatform;
use super::task::{ManualTask, TaskStatus};
use super::transaction::{Transaction, TransactionState};

/// Per-platform totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    pub transactions: u64,
    pub completed: u64,
    pub refunded: u64,
    pub net_profit: Cents,
}

/// Summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub total_transactions: u64,
    pub by_state: BTreeMap<TransactionState, u64>,
    pub by_platform: BTreeMap<SourcePlatform, PlatformStats>,
    /// Sum of stamped net profit over completed transactions.
    pub total_net_profit: Cents,
    /// Pending manual tasks.
    pub queue_depth: u64,
    pub queue_completed: u64,
    pub queue_escalated: u64,
    /// Mean of `completed_at - created_at` over completed transactions.
    pub avg_fulfillment_secs: Option<i64>,
}

impl StatsSummary {
    /// Aggregate over the full history.
    #[must_use]
    pub fn from_history(transactions: &[Transaction], tasks: &[ManualTask]) -> Self {
        let mut summary = Self {
            total_transactions: transactions.len() as u64,
            ..Self::default()
        };

        let mut latency_total: i64 = 0;
        let mut latency_count: i64 = 0;

        for tx in transactions {
            *summary.by_state.entry(tx.state).or_default() += 1;

            let net = tx.profit.as_ref().map_or(0, |p| p.net_profit);
            if tx.state == TransactionState::Completed {
                summary.total_net_profit += net;
            }

            if let Some(platform) = tx.source_platform {
                let entry = summary.by_platform.entry(platform).or_default();
                entry.transactions += 1;
                match tx.state {
                    TransactionState::Completed => {
                        entry.completed += 1;
                        entry.net_profit += net;
                    }
                    TransactionState::Refunded => entry.refunded += 1,
                    _ => {}
                }
            }

            if let Some(latency) = tx.fulfillment_latency() {
                latency_total += latency.num_seconds();
                latency_count += 1;
            }
        }

        if latency_count > 0 {
            summary.avg_fulfillment_secs = Some(latency_total / latency_count);
        }

        for task in tasks {
            if task.is_pending() {
                summary.queue_depth += 1;
                if task.is_escalated() {
                    summary.queue_escalated += 1;
                }
            } else if task.status == TaskStatus::Completed {
                summary.queue_completed += 1;
            }
        }

        summary
    }

    /// Count of transactions in `state`.
    #[must_use]
    pub fn count(&self, state: TransactionState) -> u64 {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::id::{BuyerId, ListingId, PaymentReference, TaskNumber};
    use crate::domain::task::TaskDraft;
    use crate::domain::profit::ProfitCalculator;

    fn tx(platform: SourcePlatform, state: TransactionState) -> Transaction {
        let mut tx = Transaction::new(
            BuyerId::new("b"),
            ListingId::new("l"),
            PaymentReference::new("pi"),
            1500,
            serde_json::Value::Null,
        );
        tx.source_platform = Some(platform);
        tx.state = state;
        tx
    }

    #[test]
    fn empty_history_is_all_zero() {
        let s = StatsSummary::from_history(&[], &[]);
        assert_eq!(s.total_transactions, 0);
        assert_eq!(s.total_net_profit, 0);
        assert_eq!(s.avg_fulfillment_secs, None);
    }

    #[test]
    fn profit_counts_only_completed() {
        let profit = ProfitCalculator::default()
            .compute(1500, 800, SourcePlatform::RapidApi)
            .unwrap();

        let mut done = tx(SourcePlatform::RapidApi, TransactionState::Completed);
        done.profit = Some(profit.clone());
        done.completed_at = Some(done.created_at + Duration::seconds(30));

        let mut delivered = tx(SourcePlatform::RapidApi, TransactionState::Delivered);
        delivered.profit = Some(profit);

        let refunded = tx(SourcePlatform::Fiverr, TransactionState::Refunded);

        let s = StatsSummary::from_history(&[done, delivered, refunded], &[]);
        assert_eq!(s.total_transactions, 3);
        assert_eq!(s.total_net_profit, 536);
        assert_eq!(s.count(TransactionState::Completed), 1);
        assert_eq!(s.by_platform[&SourcePlatform::RapidApi].transactions, 2);
        assert_eq!(s.by_platform[&SourcePlatform::RapidApi].net_profit, 536);
        assert_eq!(s.by_platform[&SourcePlatform::Fiverr].refunded, 1);
        assert_eq!(s.avg_fulfillment_secs, Some(30));
    }

    #[test]
    fn cancelled_tasks_leave_both_queue_counts() {
        let draft = || {
            TaskDraft::snapshot(
                &tx(SourcePlatform::Fiverr, TransactionState::Pending),
                &crate::testkit::domain::listing(SourcePlatform::Fiverr, 500),
            )
        };
        let now = chrono::Utc::now();
        let pending = ManualTask::from_draft(TaskNumber::new(1), draft(), now);
        let mut done = ManualTask::from_draft(TaskNumber::new(2), draft(), now);
        done.status = TaskStatus::Completed;
        let mut cancelled = ManualTask::from_draft(TaskNumber::new(3), draft(), now);
        cancelled.status = TaskStatus::Cancelled;

        let s = StatsSummary::from_history(&[], &[pending, done, cancelled]);
        assert_eq!(s.queue_depth, 1);
        assert_eq!(s.queue_completed, 1);
    }
}

