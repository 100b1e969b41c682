//! Derived circulation views
//!
//! Everything here is a pure function of the current books and transactions.
//! Nothing is cached: callers recompute from the latest mirrors whenever they
//! need a view.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::AvailabilityPolicy,
    models::{Book, BorrowerType, Transaction, TransactionStatus},
};

/// A book together with its live availability
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookAvailability {
    #[serde(flatten)]
    pub book: Book,
    #[serde(rename = "isAvailable")]
    pub is_available: bool,
    /// Number of loans currently out for this book
    #[serde(rename = "activeLoans")]
    pub active_loans: usize,
}

/// Catalog numbers with at least one loan out
pub fn borrowed_book_ids(transactions: &[Transaction]) -> HashSet<&str> {
    transactions
        .iter()
        .filter(|t| t.is_borrowed())
        .map(|t| t.book_id.as_str())
        .collect()
}

/// Loans currently out, per catalog number. A title may have several at
/// once when the library holds more than one copy.
pub fn active_loan_counts(transactions: &[Transaction]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for t in transactions.iter().filter(|t| t.is_borrowed()) {
        *counts.entry(t.book_id.clone()).or_insert(0) += 1;
    }
    counts
}

/// A book is available iff no borrowed transaction references it
pub fn is_available(book: &Book, transactions: &[Transaction]) -> bool {
    !transactions
        .iter()
        .any(|t| t.is_borrowed() && t.book_id == book.catalog_no)
}

pub fn availability_view(books: &[Book], transactions: &[Transaction]) -> Vec<BookAvailability> {
    let counts = active_loan_counts(transactions);
    books
        .iter()
        .map(|book| {
            let active_loans = counts.get(&book.catalog_no).copied().unwrap_or(0);
            BookAvailability {
                book: book.clone(),
                is_available: active_loans == 0,
                active_loans,
            }
        })
        .collect()
}

/// Books that may be handed out under the given policy
pub fn issuable_books<'a>(
    books: &'a [Book],
    transactions: &[Transaction],
    policy: AvailabilityPolicy,
) -> Vec<&'a Book> {
    match policy {
        AvailabilityPolicy::InfiniteCopy => books.iter().collect(),
        AvailabilityPolicy::SingleCopy => {
            let borrowed = borrowed_book_ids(transactions);
            books
                .iter()
                .filter(|b| !borrowed.contains(b.catalog_no.as_str()))
                .collect()
        }
    }
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LibraryStats {
    pub total_books: usize,
    /// Loans currently out
    pub borrowed: usize,
    /// Books with no loan out
    pub available: usize,
    pub overdue: usize,
}

pub fn library_stats(books: &[Book], transactions: &[Transaction], now: DateTime<Utc>) -> LibraryStats {
    let borrowed = borrowed_book_ids(transactions);
    LibraryStats {
        total_books: books.len(),
        borrowed: transactions.iter().filter(|t| t.is_borrowed()).count(),
        available: books
            .iter()
            .filter(|b| !borrowed.contains(b.catalog_no.as_str()))
            .count(),
        overdue: transactions.iter().filter(|t| t.is_overdue(now)).count(),
    }
}

/// Status filter of the loan history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Borrowed,
    Returned,
    Overdue,
}

/// Borrower filter of the loan history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Student,
    Staff,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default, rename = "type")]
    pub borrower_type: TypeFilter,
}

impl TransactionFilter {
    pub fn accepts(&self, t: &Transaction, now: DateTime<Utc>) -> bool {
        let matches_search = self.q.as_deref().map_or(true, |q| t.matches(q));
        let matches_status = match self.status {
            StatusFilter::All => true,
            StatusFilter::Borrowed => t.status() == TransactionStatus::Borrowed,
            StatusFilter::Returned => t.status() == TransactionStatus::Returned,
            StatusFilter::Overdue => t.is_overdue(now),
        };
        let matches_type = match self.borrower_type {
            TypeFilter::All => true,
            TypeFilter::Student => t.borrower_type == BorrowerType::Student,
            TypeFilter::Staff => t.borrower_type == BorrowerType::Staff,
        };
        matches_search && matches_status && matches_type
    }
}

/// Loan history matching the filter, newest borrow first
pub fn filter_transactions(
    transactions: &[Transaction],
    filter: &TransactionFilter,
    now: DateTime<Utc>,
) -> Vec<Transaction> {
    let mut result: Vec<Transaction> = transactions
        .iter()
        .filter(|t| filter.accepts(t, now))
        .cloned()
        .collect();
    result.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date));
    result
}
