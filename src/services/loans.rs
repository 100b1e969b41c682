//! Loan workflow: issue and return

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::{AvailabilityPolicy, LoansConfig},
    error::{AppError, AppResult},
    models::{dates, Book, Borrower, BorrowerType, ReturnPerformance, Transaction},
    repository::Repository,
    services::{
        circulation::{self, TransactionFilter},
        email::{EmailService, NotificationOutcome},
        library_store::LibraryStore,
    },
};

/// Issue request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueLoan {
    #[validate(length(min = 1, message = "Book is required"))]
    pub book_id: String,
    #[validate(length(min = 1, message = "Borrower is required"))]
    pub borrower_id: String,
    pub borrower_type: BorrowerType,
    /// Calendar date (`2024-01-15`) or RFC 3339 instant
    #[validate(length(min = 1, message = "Due date is required"))]
    pub due_date: String,
    /// Send the receipt here instead of the registered address
    #[serde(default)]
    pub override_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueReceipt {
    pub transaction: Transaction,
    pub notification: NotificationOutcome,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub transaction: Transaction,
    pub performance: ReturnPerformance,
    pub notification: NotificationOutcome,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    library: Arc<LibraryStore>,
    email: EmailService,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(
        repository: Repository,
        library: Arc<LibraryStore>,
        email: EmailService,
        config: LoansConfig,
    ) -> Self {
        Self {
            repository,
            library,
            email,
            config,
        }
    }

    /// Books the issue form may offer right now
    pub fn issuable_books(&self) -> Vec<Book> {
        let books = self.library.books();
        let transactions = self.library.transactions();
        circulation::issuable_books(&books, &transactions, self.config.availability_policy)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn policy(&self) -> AvailabilityPolicy {
        self.config.availability_policy
    }

    pub fn suggested_due_date(&self) -> DateTime<Utc> {
        dates::days_after(Utc::now(), self.config.default_loan_days)
    }

    /// Loan history from the mirror
    pub fn list(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        circulation::filter_transactions(&self.library.transactions(), filter, Utc::now())
    }

    fn resolve_book(&self, book_id: &str) -> AppResult<Book> {
        let books = self.library.books();
        let transactions = self.library.transactions();
        let policy = self.config.availability_policy;

        if let Some(book) = circulation::issuable_books(&books, &transactions, policy)
            .into_iter()
            .find(|b| b.catalog_no == book_id)
        {
            return Ok(book.clone());
        }

        if books.iter().any(|b| b.catalog_no == book_id) {
            Err(AppError::Validation(format!("Book {} is already borrowed", book_id)))
        } else {
            Err(AppError::Validation(format!("Unknown book {}", book_id)))
        }
    }

    fn resolve_borrower(&self, borrower_id: &str, kind: BorrowerType) -> AppResult<Borrower> {
        let borrower = match kind {
            BorrowerType::Student => self
                .library
                .students()
                .iter()
                .find(|s| s.regno == borrower_id)
                .map(Borrower::from),
            BorrowerType::Staff => self
                .library
                .staff()
                .iter()
                .find(|s| s.staff_id == borrower_id)
                .map(Borrower::from),
        };
        borrower.ok_or_else(|| AppError::Validation(format!("Unknown {} {}", kind, borrower_id)))
    }

    /// Issue a book: validate against the mirrors, persist, then notify
    pub async fn issue(&self, request: IssueLoan) -> AppResult<IssueReceipt> {
        if !self.library.is_ready() {
            return Err(AppError::NotReady("Library data is still loading".to_string()));
        }
        request.validate()?;

        let due_date = dates::parse_instant(&request.due_date)
            .ok_or_else(|| AppError::Validation(format!("Invalid due date: {}", request.due_date)))?;
        let book = self.resolve_book(request.book_id.trim())?;
        let borrower = self.resolve_borrower(request.borrower_id.trim(), request.borrower_type)?;

        let recipient = request
            .override_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| borrower.email.clone());

        let draft = Transaction::open(&book, &borrower, recipient, Utc::now(), due_date);
        let id = self.repository.transactions.create(&draft).await?;
        let transaction = draft.with_id(id);

        tracing::info!(
            transaction = %transaction.id,
            book = %transaction.book_id,
            borrower = %transaction.borrower_id,
            "Book issued"
        );

        let notification = self
            .email
            .notify_borrow(&transaction.borrower_email, &transaction.book_name, transaction.due_date)
            .await;

        Ok(IssueReceipt {
            transaction,
            notification,
        })
    }

    /// Close a loan at `actual_return_date`
    pub async fn return_loan(&self, id: &str, actual_return_date: DateTime<Utc>) -> AppResult<ReturnReceipt> {
        let current = self.repository.transactions.get_by_id(id).await?;
        if !current.is_borrowed() {
            tracing::warn!(transaction = %id, "Returning a loan that is already closed");
        }

        self.repository
            .transactions
            .mark_returned(id, actual_return_date)
            .await?;

        let transaction = current.returned_at(actual_return_date);
        let performance = ReturnPerformance::classify(transaction.due_date, actual_return_date);
        tracing::info!(transaction = %id, performance = performance.label(), "Book returned");

        let notification = self
            .email
            .notify_return(&transaction.borrower_email, &transaction.book_name)
            .await;

        Ok(ReturnReceipt {
            transaction,
            performance,
            notification,
        })
    }
}
