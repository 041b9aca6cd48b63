//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::transactions;

/// Database row for a transaction.
///
/// Structured fields (input, output, profit) are JSON text; timestamps are
/// RFC 3339 text.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRow {
    pub id: String,
    pub buyer: String,
    pub listing: String,
    pub payment_reference: String,
    pub amount_paid: i64,
    pub state: String,
    pub input: String,
    pub output: Option<String>,
    pub source_platform: Option<String>,
    pub task_number: Option<i64>,
    pub profit: Option<String>,
    pub failure_reason: Option<String>,
    pub refund_reference: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

/// Columns a state transition may change.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(treat_none_as_null = true)]
pub struct TransactionChanges {
    pub state: String,
    pub output: Option<String>,
    pub source_platform: Option<String>,
    pub task_number: Option<i64>,
    pub profit: Option<String>,
    pub failure_reason: Option<String>,
    pub refund_reference: Option<String>,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl From<TransactionRow> for TransactionChanges {
    fn from(row: TransactionRow) -> Self {
        Self {
            state: row.state,
            output: row.output,
            source_platform: row.source_platform,
            task_number: row.task_number,
            profit: row.profit,
            failure_reason: row.failure_reason,
            refund_reference: row.refund_reference,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        }
    }
}
