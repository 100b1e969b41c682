//! Repository layer: one thin wrapper per entity over the collection store

pub mod books;
pub mod staff;
pub mod students;
pub mod transactions;

use std::sync::Arc;

use crate::store::CollectionStore;

/// Main repository struct holding the store handle
#[derive(Clone)]
pub struct Repository {
    pub store: Arc<dyn CollectionStore>,
    pub books: books::BooksRepository,
    pub students: students::StudentsRepository,
    pub staff: staff::StaffRepository,
    pub transactions: transactions::TransactionsRepository,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self {
            books: books::BooksRepository::new(store.clone()),
            students: students::StudentsRepository::new(store.clone()),
            staff: staff::StaffRepository::new(store.clone()),
            transactions: transactions::TransactionsRepository::new(store.clone()),
            store,
        }
    }
}
