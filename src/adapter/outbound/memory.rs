//! In-memory transaction store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{Transaction, TransactionId, TransactionState, TransactionUpdate};
use crate::error::StoreError;
use crate::port::outbound::store::TransactionStore;

/// In-memory [`TransactionStore`] for tests and embedding.
///
/// The compare-and-set runs under the write lock, so it has the same
/// single-flight guarantee as the SQLite store.
#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl MemoryTransactionStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(&self, tx: &Transaction) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write();
        if transactions.contains_key(&tx.id) {
            return Err(StoreError::Duplicate(tx.id));
        }
        transactions.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut all: Vec<Transaction> = self.transactions.read().values().cloned().collect();
        all.sort_by_key(|t| (t.created_at, t.id));
        Ok(all)
    }

    async fn transition(
        &self,
        id: TransactionId,
        from: TransactionState,
        to: TransactionState,
        update: TransactionUpdate,
    ) -> Result<Transaction, StoreError> {
        from.transition(to)?;
        let mut transactions = self.transactions.write();
        let tx = transactions.get_mut(&id).ok_or(StoreError::NotFound(id))?;
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
        update.apply(tx, to, Utc::now());
        Ok(tx.clone())
    }
}
