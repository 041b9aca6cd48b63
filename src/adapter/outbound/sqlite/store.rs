//! SQLite transaction store implementation.
//!
//! Transitions run inside `BEGIN IMMEDIATE` and the final `UPDATE` is guarded
//! by `WHERE id = ? AND state = ?`; an affected-row count of zero means the
//! compare-and-set lost.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use super::database::connection::DbPool;
use super::database::model::{TransactionChanges, TransactionRow};
use super::database::schema::transactions;
use crate::domain::{
    BuyerId, ListingId, PaymentReference, SourcePlatform, TaskNumber, Transaction, TransactionId,
    TransactionState, TransactionUpdate,
};
use crate::error::StoreError;
use crate::port::outbound::store::TransactionStore;

/// SQLite-backed [`TransactionStore`].
pub struct SqliteTransactionStore {
    /// Database connection pool.
    pool: DbPool,
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl SqliteTransactionStore {
    /// Create a new SQLite transaction store with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>, StoreError>
    {
        self.pool
            .get()
            .map_err(|e| StoreError::Backend(format!("connection: {e}")))
    }

    fn to_row(tx: &Transaction) -> Result<TransactionRow, StoreError> {
        Ok(TransactionRow {
            id: tx.id.to_string(),
            buyer: tx.buyer.to_string(),
            listing: tx.listing.to_string(),
            payment_reference: tx.payment_reference.to_string(),
            amount_paid: tx.amount_paid,
            state: tx.state.as_str().to_string(),
            input: to_json(&tx.input)?,
            output: tx.output.as_ref().map(to_json).transpose()?,
            source_platform: tx.source_platform.map(|p| p.as_str().to_string()),
            task_number: tx.task_number.map(|n| n.value() as i64),
            profit: tx.profit.as_ref().map(to_json).transpose()?,
            failure_reason: tx.failure_reason.clone(),
            refund_reference: tx.refund_reference.clone(),
            created_at: timestamp(tx.created_at),
            updated_at: timestamp(tx.updated_at),
            completed_at: tx.completed_at.map(timestamp),
        })
    }

    fn from_row(row: TransactionRow) -> Result<Transaction, StoreError> {
        Ok(Transaction {
            id: row
                .id
                .parse::<TransactionId>()
                .map_err(|e| parse_error("id", e))?,
            buyer: BuyerId::new(row.buyer),
            listing: ListingId::new(row.listing),
            payment_reference: PaymentReference::new(row.payment_reference),
            amount_paid: row.amount_paid,
            state: row
                .state
                .parse::<TransactionState>()
                .map_err(|e| parse_error("state", e))?,
            input: from_json(&row.input)?,
            output: row.output.as_deref().map(from_json).transpose()?,
            source_platform: row
                .source_platform
                .map(|p| p.parse::<SourcePlatform>())
                .transpose()
                .map_err(|e| parse_error("source_platform", e))?,
            task_number: row.task_number.map(|n| TaskNumber::new(n as u64)),
            profit: row.profit.as_deref().map(from_json).transpose()?,
            failure_reason: row.failure_reason,
            refund_reference: row.refund_reference,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            completed_at: row.completed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    fn load(conn: &mut SqliteConnection, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> = transactions::table
            .find(id.to_string())
            .select(TransactionRow::as_select())
            .first(conn)
            .optional()?;
        row.map(Self::from_row).transpose()
    }
}

#[async_trait]
impl TransactionStore for SqliteTransactionStore {
    async fn insert(&self, tx: &Transaction) -> Result<(), StoreError> {
        let row = Self::to_row(tx)?;
        let mut conn = self.conn()?;
        diesel::insert_into(transactions::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::Duplicate(tx.id)
                }
                other => other.into(),
            })?;
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.conn()?;
        Self::load(&mut conn, id)
    }

    async fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut conn = self.conn()?;
        let rows: Vec<TransactionRow> = transactions::table
            .order((transactions::created_at.asc(), transactions::id.asc()))
            .select(TransactionRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(Self::from_row).collect()
    }

    async fn transition(
        &self,
        id: TransactionId,
        from: TransactionState,
        to: TransactionState,
        update: TransactionUpdate,
    ) -> Result<Transaction, StoreError> {
        from.transition(to)?;
        let mut conn = self.conn()?;

        conn.immediate_transaction(|conn| {
            let mut tx = Self::load(conn, id)?.ok_or(StoreError::NotFound(id))?;
            if tx.state != from {
                return Err(StoreError::StateMismatch {
                    id,
                    expected: from,
                    actual: tx.state,
                });
            }
            if update.output.is_some() && tx.output.is_some() {
                return Err(StoreError::OutputAlreadySet(id));
            }

            update.apply(&mut tx, to, Utc::now());
            let changes = TransactionChanges::from(Self::to_row(&tx)?);

            let affected = diesel::update(
                transactions::table
                    .filter(transactions::id.eq(id.to_string()))
                    .filter(transactions::state.eq(from.as_str())),
            )
            .set(&changes)
            .execute(conn)?;

            if affected == 0 {
                let actual = Self::load(conn, id)?.map_or(from, |t| t.state);
                return Err(StoreError::StateMismatch {
                    id,
                    expected: from,
                    actual,
                });
            }
            Ok(tx)
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| parse_error("timestamp", e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Backend(e.to_string()))
}

fn parse_error(field: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("invalid {field} column: {err}"))
}
