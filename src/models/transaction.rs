//! Loan transaction model and derived classifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

use super::book::Book;
use super::member::{Borrower, BorrowerType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Borrowed,
    Returned,
}

/// How a completed loan compared to its due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ReturnPerformance {
    Early,
    #[serde(rename = "On-Time")]
    OnTime,
    Late,
}

impl ReturnPerformance {
    /// Compare at full timestamp precision
    pub fn classify(due: DateTime<Utc>, actual: DateTime<Utc>) -> Self {
        match (actual - due).cmp(&chrono::Duration::zero()) {
            Ordering::Less => ReturnPerformance::Early,
            Ordering::Equal => ReturnPerformance::OnTime,
            Ordering::Greater => ReturnPerformance::Late,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReturnPerformance::Early => "Early",
            ReturnPerformance::OnTime => "On-Time",
            ReturnPerformance::Late => "Late",
        }
    }
}

/// Loan record from the `transactions` collection.
///
/// `status` is `returned` exactly when `actual_return_date` is set. Both are
/// private so the pair can only change through the constructors below, and
/// documents breaking the rule fail to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", try_from = "TransactionRecord")]
pub struct Transaction {
    /// Store-assigned id
    pub id: String,
    pub book_id: String,
    pub book_name: String,
    pub borrower_id: String,
    pub borrower_type: BorrowerType,
    pub borrower_name: String,
    pub borrower_email: String,
    pub borrow_date: DateTime<Utc>,
    /// Due date
    #[serde(rename = "returnDate")]
    pub due_date: DateTime<Utc>,
    actual_return_date: Option<DateTime<Utc>>,
    status: TransactionStatus,
}

/// Wire shape used while decoding, before the status rule is checked
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRecord {
    #[serde(default)]
    id: String,
    book_id: String,
    #[serde(default)]
    book_name: String,
    borrower_id: String,
    borrower_type: BorrowerType,
    #[serde(default)]
    borrower_name: String,
    #[serde(default)]
    borrower_email: String,
    borrow_date: DateTime<Utc>,
    return_date: DateTime<Utc>,
    #[serde(default)]
    actual_return_date: Option<DateTime<Utc>>,
    status: TransactionStatus,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = String;

    fn try_from(r: TransactionRecord) -> Result<Self, Self::Error> {
        match (r.status, r.actual_return_date) {
            (TransactionStatus::Borrowed, Some(_)) => {
                return Err("borrowed transaction carries an actualReturnDate".to_string())
            }
            (TransactionStatus::Returned, None) => {
                return Err("returned transaction has no actualReturnDate".to_string())
            }
            _ => {}
        }

        Ok(Self {
            id: r.id,
            book_id: r.book_id,
            book_name: r.book_name,
            borrower_id: r.borrower_id,
            borrower_type: r.borrower_type,
            borrower_name: r.borrower_name,
            borrower_email: r.borrower_email,
            borrow_date: r.borrow_date,
            due_date: r.return_date,
            actual_return_date: r.actual_return_date,
            status: r.status,
        })
    }
}

impl Transaction {
    /// A fresh loan, not yet persisted (empty id)
    pub fn open(
        book: &Book,
        borrower: &Borrower,
        recipient_email: String,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            book_id: book.catalog_no.clone(),
            book_name: book.title.clone(),
            borrower_id: borrower.id.clone(),
            borrower_type: borrower.kind,
            borrower_name: borrower.name.clone(),
            borrower_email: recipient_email,
            borrow_date,
            due_date,
            actual_return_date: None,
            status: TransactionStatus::Borrowed,
        }
    }

    pub fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }

    /// This loan as it looks once returned at `at`
    pub fn returned_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            actual_return_date: Some(at),
            status: TransactionStatus::Returned,
            ..self.clone()
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn actual_return_date(&self) -> Option<DateTime<Utc>> {
        self.actual_return_date
    }

    pub fn is_borrowed(&self) -> bool {
        self.status == TransactionStatus::Borrowed
    }

    /// Still out and past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_borrowed() && self.due_date < now
    }

    /// Only defined once returned
    pub fn performance(&self) -> Option<ReturnPerformance> {
        match (self.status, self.actual_return_date) {
            (TransactionStatus::Returned, Some(actual)) => {
                Some(ReturnPerformance::classify(self.due_date, actual))
            }
            _ => None,
        }
    }

    /// Case-insensitive match on book name, borrower name, borrower id or book id
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        [&self.book_name, &self.borrower_name, &self.borrower_id, &self.book_id]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}
