//! Students repository (read-only)

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::Student,
    store::{decode_snapshot, Collection, CollectionStore},
};

#[derive(Clone)]
pub struct StudentsRepository {
    store: Arc<dyn CollectionStore>,
}

impl StudentsRepository {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Student>> {
        let docs = self.store.get_all(Collection::Students).await?;
        Ok(decode_snapshot(Collection::Students, &docs))
    }

    pub async fn get_by_id(&self, regno: &str) -> AppResult<Option<Student>> {
        match self.store.get(Collection::Students, regno).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }
}
