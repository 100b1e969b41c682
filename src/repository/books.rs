//! Books repository

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::Book,
    store::{decode_snapshot, encode, Collection, CollectionStore},
};

#[derive(Clone)]
pub struct BooksRepository {
    store: Arc<dyn CollectionStore>,
}

impl BooksRepository {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Book>> {
        let docs = self.store.get_all(Collection::Books).await?;
        Ok(decode_snapshot(Collection::Books, &docs))
    }

    /// Get book by catalog number
    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Book>> {
        match self.store.get(Collection::Books, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Create or fully replace a book, keyed by its catalog number
    pub async fn upsert(&self, book: &Book) -> AppResult<()> {
        if book.catalog_no.is_empty() {
            return Err(AppError::Validation("Catalog number is required".to_string()));
        }
        self.store
            .set(Collection::Books, &book.catalog_no, encode(book)?)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.store.delete(Collection::Books, id).await?;
        Ok(())
    }
}
