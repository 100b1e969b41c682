//! Catalog service: public search and admin book management

use std::sync::Arc;

use serde::Deserialize;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookInput},
    repository::Repository,
    services::{
        circulation::{self, BookAvailability},
        library_store::LibraryStore,
    },
};

/// Catalog search query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    library: Arc<LibraryStore>,
}

fn search(view: Vec<BookAvailability>, query: &CatalogQuery) -> Vec<BookAvailability> {
    match query.q.as_deref() {
        Some(q) => view.into_iter().filter(|b| b.book.matches(q)).collect(),
        None => view,
    }
}

impl CatalogService {
    pub fn new(repository: Repository, library: Arc<LibraryStore>) -> Self {
        Self { repository, library }
    }

    /// Public catalog, fetched on demand rather than read from the mirror
    pub async fn public_catalog(&self, query: &CatalogQuery) -> AppResult<Vec<BookAvailability>> {
        let books = self.repository.books.get_all().await?;
        let active = self.repository.transactions.get_active().await?;
        tracing::debug!(books = books.len(), active = active.len(), "Public catalog fetched");
        Ok(search(circulation::availability_view(&books, &active), query))
    }

    /// Admin listing from the mirror, with live loan counts
    pub fn list(&self, query: &CatalogQuery) -> Vec<BookAvailability> {
        let books = self.library.books();
        let transactions = self.library.transactions();
        search(circulation::availability_view(&books, &transactions), query)
    }

    pub async fn get(&self, catalog_no: &str) -> AppResult<Book> {
        self.repository
            .books
            .get_by_id(catalog_no)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", catalog_no)))
    }

    /// Create or replace a book keyed by its catalog number
    pub async fn upsert(&self, input: BookInput) -> AppResult<Book> {
        input.validate()?;
        let book = Book::from(input);
        if book.catalog_no.is_empty() || book.title.is_empty() {
            return Err(AppError::Validation("Catalog number and book name are required".to_string()));
        }
        self.repository.books.upsert(&book).await?;
        tracing::info!(book = %book.catalog_no, "Book saved");
        Ok(book)
    }

    pub async fn delete(&self, catalog_no: &str) -> AppResult<()> {
        let active = self
            .library
            .transactions()
            .iter()
            .filter(|t| t.is_borrowed() && t.book_id == catalog_no)
            .count();
        if active > 0 {
            tracing::warn!(book = %catalog_no, active, "Deleting a book with loans still out");
        }
        self.repository.books.delete(catalog_no).await?;
        tracing::info!(book = %catalog_no, "Book deleted");
        Ok(())
    }
}
