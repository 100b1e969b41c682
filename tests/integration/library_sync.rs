//! Live mirror synchronization

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio_test::assert_ok;
use smartlib_server::{
    services::library_store::LibraryStore,
    store::{Collection, CollectionStore, MemoryStore},
};

use crate::common::{eventually, seeded_store};

fn counting_callback(counter: &Arc<AtomicUsize>) -> Box<dyn FnOnce() + Send> {
    let counter = counter.clone();
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test]
async fn test_mirrors_follow_remote_writes() {
    let store = seeded_store();
    let library = LibraryStore::new(Arc::new(store.clone()));
    library.init(None);
    library.ready().await;

    assert_eq!(library.books().len(), 1);
    assert_eq!(library.books()[0].id, "B001");
    assert_eq!(library.students().len(), 1);
    assert_eq!(library.staff().len(), 1);
    assert!(library.transactions().is_empty());
    assert!(!library.has_errors());

    store.insert(
        Collection::Books,
        "B002",
        json!({ "New NO.": "B002", "NAME OF THE BOOK": "Second Title" }),
    );
    eventually(|| library.books().len() == 2).await;

    assert_ok!(store.delete(Collection::Books, "B001").await);
    eventually(|| library.books().len() == 1).await;
    assert_eq!(library.books()[0].catalog_no, "B002");
}

#[tokio::test]
async fn test_denied_transactions_still_reach_readiness() {
    let store = seeded_store();
    store.deny(Collection::Transactions);

    let library = LibraryStore::new(Arc::new(store.clone()));
    let fired = Arc::new(AtomicUsize::new(0));
    library.init(Some(counting_callback(&fired)));
    library.ready().await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(library.is_ready());
    assert!(library.has_errors());
    assert!(library.transactions().is_empty());
    assert_eq!(library.books().len(), 1);
}

#[tokio::test]
async fn test_later_error_keeps_last_mirror() {
    let store = seeded_store();
    store.insert(
        Collection::Transactions,
        "tx1",
        json!({
            "bookId": "B001", "bookName": "Test Title", "borrowerId": "S100",
            "borrowerType": "student", "borrowerName": "Asha Rao", "borrowerEmail": "asha@college.edu",
            "borrowDate": "2024-01-01T00:00:00Z", "returnDate": "2024-01-15T00:00:00Z",
            "actualReturnDate": null, "status": "borrowed"
        }),
    );

    let library = LibraryStore::new(Arc::new(store.clone()));
    let fired = Arc::new(AtomicUsize::new(0));
    library.init(Some(counting_callback(&fired)));
    library.ready().await;
    assert!(!library.has_errors());

    store.deny(Collection::Transactions);
    eventually(|| library.has_errors()).await;

    assert_eq!(library.transactions().len(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_init_does_not_resubscribe() {
    let store = seeded_store();
    let library = LibraryStore::new(Arc::new(store.clone()));
    library.init(None);
    library.ready().await;

    let fired = Arc::new(AtomicUsize::new(0));
    library.init(Some(counting_callback(&fired)));
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    for collection in Collection::ALL {
        assert_eq!(store.subscriber_count(collection), 1, "{}", collection);
    }
}

#[tokio::test]
async fn test_destroy_then_init_starts_clean() {
    let store = seeded_store();
    store.deny(Collection::Staff);

    let library = LibraryStore::new(Arc::new(store.clone()));
    library.init(None);
    library.ready().await;
    assert!(library.has_errors());

    library.destroy();
    assert!(!library.is_initialized());
    eventually(|| store.subscriber_count(Collection::Books) == 0).await;

    store.allow(Collection::Staff);
    let fired = Arc::new(AtomicUsize::new(0));
    library.init(Some(counting_callback(&fired)));
    library.ready().await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!library.has_errors());
    assert_eq!(library.staff().len(), 1);
}

#[tokio::test]
async fn test_malformed_documents_are_skipped() {
    let store = MemoryStore::new();
    store.insert(Collection::Books, "B001", json!({ "New NO.": "B001", "NAME OF THE BOOK": "Good" }));
    store.insert(Collection::Books, "B002", json!({ "unexpected": true }));
    store.insert(
        Collection::Transactions,
        "tx-bad",
        json!({
            "bookId": "B001", "borrowerId": "S1", "borrowerType": "student",
            "borrowDate": "2024-01-01T00:00:00Z", "returnDate": "2024-01-15T00:00:00Z",
            "status": "returned"
        }),
    );

    let library = LibraryStore::new(Arc::new(store));
    library.init(None);
    library.ready().await;

    assert_eq!(library.books().len(), 1);
    assert!(library.transactions().is_empty());
    assert!(!library.has_errors());
}

#[tokio::test]
async fn test_drop_cancels_subscriptions() {
    let store = seeded_store();
    {
        let library = LibraryStore::new(Arc::new(store.clone()));
        library.init(None);
        library.ready().await;
        assert_eq!(store.subscriber_count(Collection::Transactions), 1);
    }
    eventually(|| store.subscriber_count(Collection::Transactions) == 0).await;
}
