//! Issue and return workflow against live mirrors

use chrono::{DateTime, TimeZone, Utc};
use smartlib_server::{
    config::AvailabilityPolicy,
    models::{BorrowerType, ReturnPerformance, TransactionStatus},
    services::{
        circulation::{availability_view, is_available},
        email::{FailureKind, NotifyError},
        loans::IssueLoan,
    },
    store::Collection,
    AppError,
};

use tokio_test::{assert_err, assert_ok};

use crate::common::{eventually, seeded_store, Harness, RecordingNotifier};

fn issue_b001(due: &str) -> IssueLoan {
    IssueLoan {
        book_id: "B001".into(),
        borrower_id: "S100".into(),
        borrower_type: BorrowerType::Student,
        due_date: due.into(),
        override_email: None,
    }
}

fn b001_available(h: &Harness) -> bool {
    let books = h.library().books();
    let book = books.iter().find(|b| b.catalog_no == "B001").unwrap();
    is_available(book, &h.library().transactions())
}

fn at(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
}

#[tokio::test]
async fn test_issue_then_return_single_copy() {
    let h = Harness::start(seeded_store(), RecordingNotifier::default(), AvailabilityPolicy::SingleCopy).await;
    assert!(b001_available(&h));

    let before = Utc::now();
    let receipt = h
        .state
        .services
        .loans
        .issue(issue_b001("2024-01-15T00:00:00Z"))
        .await
        .unwrap();
    let tx = receipt.transaction;

    assert_eq!(tx.status(), TransactionStatus::Borrowed);
    assert_eq!(tx.book_id, "B001");
    assert_eq!(tx.borrower_id, "S100");
    assert_eq!(tx.due_date, at("2024-01-15T00:00:00Z"));
    assert_eq!(tx.actual_return_date(), None);
    assert!(tx.borrow_date >= before && tx.borrow_date <= Utc::now());
    assert_eq!(h.store.len(Collection::Transactions), 1);

    eventually(|| !b001_available(&h)).await;

    let returned_at = at("2024-01-20T00:00:00Z");
    let receipt = h.state.services.loans.return_loan(&tx.id, returned_at).await.unwrap();
    assert_eq!(receipt.transaction.status(), TransactionStatus::Returned);
    assert_eq!(receipt.transaction.actual_return_date(), Some(returned_at));
    assert_eq!(receipt.performance, ReturnPerformance::Late);

    eventually(|| b001_available(&h)).await;
    let mirrored = h.library().transactions();
    assert_eq!(mirrored[0].performance(), Some(ReturnPerformance::Late));

    let subjects: Vec<String> = h.notifier.sent().into_iter().map(|m| m.subject).collect();
    assert_eq!(
        subjects,
        vec![
            "Issue Receipt: Test Title".to_string(),
            "Return Confirmation: Test Title".to_string()
        ]
    );
}

#[tokio::test]
async fn test_infinite_copy_keeps_book_issuable() {
    let h = Harness::start(seeded_store(), RecordingNotifier::default(), AvailabilityPolicy::InfiniteCopy).await;
    let loans = &h.state.services.loans;

    assert_ok!(loans.issue(issue_b001("2024-01-15")).await);
    eventually(|| h.library().transactions().len() == 1).await;

    // Availability still reports the loan, issuance ignores it
    assert!(!b001_available(&h));
    assert_eq!(loans.issuable_books().len(), 1);

    let mut staff = issue_b001("2024-01-22");
    staff.borrower_id = "T9".into();
    staff.borrower_type = BorrowerType::Staff;
    loans.issue(staff).await.unwrap();
    eventually(|| h.library().transactions().len() == 2).await;

    let view = availability_view(&h.library().books(), &h.library().transactions());
    assert_eq!(view[0].active_loans, 2);
}

#[tokio::test]
async fn test_on_time_and_early_returns() {
    let h = Harness::start(seeded_store(), RecordingNotifier::default(), AvailabilityPolicy::InfiniteCopy).await;
    let loans = &h.state.services.loans;
    let due = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

    let first = loans.issue(issue_b001("2024-01-15")).await.unwrap().transaction;
    let second = loans.issue(issue_b001("2024-01-15")).await.unwrap().transaction;

    let on_time = loans.return_loan(&first.id, due).await.unwrap();
    assert_eq!(on_time.performance, ReturnPerformance::OnTime);

    let early = loans
        .return_loan(&second.id, due - chrono::Duration::days(3))
        .await
        .unwrap();
    assert_eq!(early.performance, ReturnPerformance::Early);
}

#[tokio::test]
async fn test_notification_failure_is_reported_not_raised() {
    let notifier = RecordingNotifier::failing(NotifyError::Network("cross-origin request blocked".into()));
    let h = Harness::start(seeded_store(), notifier, AvailabilityPolicy::SingleCopy).await;

    let mut request = issue_b001("2024-01-15");
    request.override_email = Some("desk@library.com".into());
    let receipt = h.state.services.loans.issue(request).await.unwrap();

    assert_eq!(receipt.transaction.borrower_email, "desk@library.com");
    assert!(!receipt.notification.success);
    assert_eq!(receipt.notification.recipient, "desk@library.com");
    assert!(receipt.notification.html.contains("Test Title"));
    assert_eq!(receipt.notification.error.unwrap().kind, FailureKind::NetworkBlocked);
    assert_eq!(h.store.len(Collection::Transactions), 1);
}

#[tokio::test]
async fn test_issue_validation_errors_write_nothing() {
    let h = Harness::start(seeded_store(), RecordingNotifier::default(), AvailabilityPolicy::SingleCopy).await;
    let loans = &h.state.services.loans;

    let mut unknown_borrower = issue_b001("2024-01-15");
    unknown_borrower.borrower_id = "S999".into();
    assert!(matches!(loans.issue(unknown_borrower).await, Err(AppError::Validation(_))));

    assert!(matches!(loans.issue(issue_b001("soon")).await, Err(AppError::Validation(_))));

    assert_eq!(h.store.len(Collection::Transactions), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_aborts_without_notifying() {
    let h = Harness::start(seeded_store(), RecordingNotifier::default(), AvailabilityPolicy::SingleCopy).await;
    let loans = &h.state.services.loans;

    let issued = loans.issue(issue_b001("2024-01-15")).await.unwrap().transaction;
    h.store.set_offline(true);

    let error = assert_err!(loans.return_loan(&issued.id, Utc::now()).await);
    assert!(matches!(error, AppError::Store(_)));

    h.store.set_offline(false);
    eventually(|| !h.library().transactions().is_empty()).await;
    assert!(h.library().transactions().iter().all(|t| t.is_borrowed()));
    assert_eq!(h.notifier.sent().len(), 1);
}
