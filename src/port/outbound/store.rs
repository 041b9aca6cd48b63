//! Transaction persistence port.

use async_trait::async_trait;

use crate::domain::{Transaction, TransactionId, TransactionState, TransactionUpdate};
use crate::error::StoreError;

/// Storage operations for transactions.
///
/// Every state change goes through [`TransactionStore::transition`], an
/// atomic compare-and-set against the persisted state. Two callers racing
/// `PENDING → PROCESSING` on one id see exactly one success.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a new transaction. Fails with [`StoreError::Duplicate`] if the
    /// id exists.
    async fn insert(&self, tx: &Transaction) -> Result<(), StoreError>;

    /// Load a transaction.
    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// All transactions, oldest first.
    async fn list(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Move `id` from `from` to `to` and apply `update`, but only if the
    /// stored state is still `from`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::StateMismatch`] when the stored state differs
    /// - [`StoreError::Domain`] when the state machine forbids `from → to`
    /// - [`StoreError::OutputAlreadySet`] when `update` carries an output and
    ///   one is already recorded
    async fn transition(
        &self,
        id: TransactionId,
        from: TransactionState,
        to: TransactionState,
        update: TransactionUpdate,
    ) -> Result<Transaction, StoreError>;
}
