//! Transactions repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map};

use crate::{
    error::{AppError, AppResult},
    models::{Transaction, TransactionStatus},
    store::{decode_snapshot, encode, Collection, CollectionStore},
};

#[derive(Clone)]
pub struct TransactionsRepository {
    store: Arc<dyn CollectionStore>,
}

impl TransactionsRepository {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Transaction>> {
        let docs = self.store.get_all(Collection::Transactions).await?;
        Ok(decode_snapshot(Collection::Transactions, &docs))
    }

    /// Loans currently out
    pub async fn get_active(&self) -> AppResult<Vec<Transaction>> {
        let mut transactions = self.get_all().await?;
        transactions.retain(Transaction::is_borrowed);
        Ok(transactions)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Transaction> {
        self.store
            .get(Collection::Transactions, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))?
            .decode()
            .map_err(AppError::from)
    }

    /// Persist a new loan and return its generated id
    pub async fn create(&self, transaction: &Transaction) -> AppResult<String> {
        let id = self
            .store
            .add(Collection::Transactions, encode(transaction)?)
            .await?;
        Ok(id)
    }

    /// Close a loan: status and actual return date change together
    pub async fn mark_returned(&self, id: &str, actual_return_date: DateTime<Utc>) -> AppResult<()> {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(TransactionStatus::Returned));
        fields.insert("actualReturnDate".to_string(), json!(actual_return_date));

        self.store
            .update(Collection::Transactions, id, fields)
            .await?;
        Ok(())
    }
}
