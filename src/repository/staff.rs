//! Staff repository (read-only)

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::Staff,
    store::{decode_snapshot, Collection, CollectionStore},
};

#[derive(Clone)]
pub struct StaffRepository {
    store: Arc<dyn CollectionStore>,
}

impl StaffRepository {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Staff>> {
        let docs = self.store.get_all(Collection::Staff).await?;
        Ok(decode_snapshot(Collection::Staff, &docs))
    }

    pub async fn get_by_id(&self, staff_id: &str) -> AppResult<Option<Staff>> {
        match self.store.get(Collection::Staff, staff_id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }
}
