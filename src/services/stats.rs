//! Dashboard statistics

use std::sync::Arc;

use chrono::Utc;

use crate::services::{
    circulation::{self, LibraryStats},
    library_store::LibraryStore,
};

#[derive(Clone)]
pub struct StatsService {
    library: Arc<LibraryStore>,
}

impl StatsService {
    pub fn new(library: Arc<LibraryStore>) -> Self {
        Self { library }
    }

    /// Counters computed from the current mirrors
    pub fn overview(&self) -> LibraryStats {
        let snapshot = self.library.snapshot();
        circulation::library_stats(&snapshot.books, &snapshot.transactions, Utc::now())
    }
}
