//! Live in-memory mirrors of the library collections
//!
//! `LibraryStore` opens one live subscription per collection and keeps a
//! mirror of each, replaced wholesale on every snapshot. Each subscription
//! runs in its own task and is the only writer of its mirror; readers take
//! cheap `Arc` snapshots. Mirrors are updated independently, so a snapshot of
//! all four is never guaranteed to be mutually consistent.
//!
//! Readiness is reached once every collection has settled, meaning it has
//! delivered its first snapshot or its first error, or its subscription ended
//! without delivering anything. A failing collection keeps its last mirror,
//! raises `has_errors` and still counts as settled.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    models::{Book, Staff, Student, Transaction},
    store::{decode_snapshot, Collection, CollectionStore},
};

/// Invoked once all collections have settled
pub type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

type Mirror<T> = watch::Sender<Arc<Vec<T>>>;

/// Point-in-time view of all four mirrors
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    pub books: Arc<Vec<Book>>,
    pub students: Arc<Vec<Student>>,
    pub staff: Arc<Vec<Staff>>,
    pub transactions: Arc<Vec<Transaction>>,
}

struct Shared {
    books: Mirror<Book>,
    students: Mirror<Student>,
    staff: Mirror<Staff>,
    transactions: Mirror<Transaction>,
    has_errors: AtomicBool,
    ready: watch::Sender<bool>,
    /// Bumped by every fresh `init`
    generation: AtomicU64,
}

/// Settlement counter for one `init` cycle
struct Readiness {
    generation: u64,
    pending: AtomicUsize,
    callback: Mutex<Option<ReadyCallback>>,
    shared: Arc<Shared>,
}

impl Readiness {
    fn new(shared: Arc<Shared>, callback: Option<ReadyCallback>) -> Self {
        Self {
            generation: shared.generation.load(Ordering::SeqCst),
            pending: AtomicUsize::new(Collection::ALL.len()),
            callback: Mutex::new(callback),
            shared,
        }
    }

    /// Called at most once per collection
    fn settle(&self, collection: Collection) {
        let remaining = self.pending.fetch_sub(1, Ordering::AcqRel) - 1;
        tracing::debug!(collection = %collection, remaining, "Collection settled");
        if remaining > 0 {
            return;
        }
        // A task cancelled by `destroy` may still settle; it must not flip a newer cycle
        if self.shared.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }

        self.shared.ready.send_replace(true);
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::info!(
            has_errors = self.shared.has_errors.load(Ordering::SeqCst),
            "Library store ready"
        );
        if let Some(callback) = callback {
            callback();
        }
    }
}

pub struct LibraryStore {
    backend: Arc<dyn CollectionStore>,
    shared: Arc<Shared>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

fn empty_mirror<T>() -> Mirror<T> {
    watch::Sender::new(Arc::new(Vec::new()))
}

impl LibraryStore {
    pub fn new(backend: Arc<dyn CollectionStore>) -> Self {
        Self {
            backend,
            shared: Arc::new(Shared {
                books: empty_mirror(),
                students: empty_mirror(),
                staff: empty_mirror(),
                transactions: empty_mirror(),
                has_errors: AtomicBool::new(false),
                ready: watch::Sender::new(false),
                generation: AtomicU64::new(0),
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start live synchronization of all collections.
    ///
    /// Idempotent: while subscriptions are active nothing new is opened and
    /// `on_ready` runs immediately. Must be called within a tokio runtime.
    pub fn init(&self, on_ready: Option<ReadyCallback>) {
        let mut listeners = self.listeners();
        if !listeners.is_empty() {
            tracing::debug!("Library store already initialized");
            drop(listeners);
            if let Some(callback) = on_ready {
                callback();
            }
            return;
        }

        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.has_errors.store(false, Ordering::SeqCst);
        self.shared.ready.send_replace(false);

        let readiness = Arc::new(Readiness::new(self.shared.clone(), on_ready));

        let shared = self.shared.clone();
        listeners.push(self.listen(Collection::Books, readiness.clone(), move |books| {
            shared.books.send_replace(books);
        }));
        let shared = self.shared.clone();
        listeners.push(self.listen(Collection::Students, readiness.clone(), move |students| {
            shared.students.send_replace(students);
        }));
        let shared = self.shared.clone();
        listeners.push(self.listen(Collection::Staff, readiness.clone(), move |staff| {
            shared.staff.send_replace(staff);
        }));
        let shared = self.shared.clone();
        listeners.push(self.listen(Collection::Transactions, readiness, move |transactions| {
            shared.transactions.send_replace(transactions);
        }));

        tracing::info!(collections = listeners.len(), "Library store subscriptions opened");
    }

    /// Spawn the task that applies one collection's snapshots to its mirror
    fn listen<T, F>(&self, collection: Collection, readiness: Arc<Readiness>, apply: F) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(Arc<Vec<T>>) + Send + 'static,
    {
        let mut updates = self.backend.subscribe(collection);
        let shared = self.shared.clone();

        tokio::spawn(async move {
            let mut settled = false;

            while let Some(event) = updates.recv().await {
                match event {
                    Ok(documents) => {
                        let records: Vec<T> = decode_snapshot(collection, &documents);
                        tracing::debug!(collection = %collection, count = records.len(), "Mirror updated");
                        apply(Arc::new(records));
                    }
                    Err(e) => {
                        tracing::error!(collection = %collection, error = %e, "Sync error");
                        shared.has_errors.store(true, Ordering::SeqCst);
                    }
                }

                if !settled {
                    settled = true;
                    readiness.settle(collection);
                }
            }

            if !settled {
                // Closed before its first delivery
                tracing::error!(collection = %collection, "Subscription closed before first snapshot");
                shared.has_errors.store(true, Ordering::SeqCst);
                readiness.settle(collection);
            } else {
                tracing::debug!(collection = %collection, "Subscription closed");
            }
        })
    }

    /// Cancel all subscriptions so that a later `init` starts clean.
    /// Mirrors keep their last contents.
    pub fn destroy(&self) {
        let handles: Vec<_> = self.listeners().drain(..).collect();
        let count = handles.len();
        for handle in handles {
            handle.abort();
        }
        if count > 0 {
            tracing::info!(subscriptions = count, "Library store subscriptions cancelled");
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.listeners().is_empty()
    }

    /// True once any subscription has reported an error since the last `init`
    pub fn has_errors(&self) -> bool {
        self.shared.has_errors.load(Ordering::SeqCst)
    }

    /// True once every collection has settled since the last `init`
    pub fn is_ready(&self) -> bool {
        *self.shared.ready.borrow()
    }

    /// Wait until every collection has settled
    pub async fn ready(&self) {
        let mut rx = self.shared.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn books(&self) -> Arc<Vec<Book>> {
        self.shared.books.borrow().clone()
    }

    pub fn students(&self) -> Arc<Vec<Student>> {
        self.shared.students.borrow().clone()
    }

    pub fn staff(&self) -> Arc<Vec<Staff>> {
        self.shared.staff.borrow().clone()
    }

    pub fn transactions(&self) -> Arc<Vec<Transaction>> {
        self.shared.transactions.borrow().clone()
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        LibrarySnapshot {
            books: self.books(),
            students: self.students(),
            staff: self.staff(),
            transactions: self.transactions(),
        }
    }

    /// Change feed for the transactions mirror
    pub fn watch_transactions(&self) -> watch::Receiver<Arc<Vec<Transaction>>> {
        self.shared.transactions.subscribe()
    }

    /// Change feed for the books mirror
    pub fn watch_books(&self) -> watch::Receiver<Arc<Vec<Book>>> {
        self.shared.books.subscribe()
    }
}

impl Drop for LibraryStore {
    fn drop(&mut self) {
        self.destroy();
    }
}
