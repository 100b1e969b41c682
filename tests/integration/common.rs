//! Shared fixtures

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use smartlib_server::{
    config::{AppConfig, AvailabilityPolicy},
    repository::Repository,
    services::{
        auth::hash_password,
        email::{EmailMessage, Notifier, NotifyError},
        library_store::LibraryStore,
        Services,
    },
    store::{Collection, CollectionStore, MemoryStore},
    AppState,
};

pub const ADMIN_PASSWORD: &str = "circulation-desk";

/// Notifier that records every message and optionally fails
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail_with: Option<NotifyError>,
}

impl RecordingNotifier {
    pub fn failing(error: NotifyError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// One book, one student, one staff member
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(
        Collection::Books,
        "B001",
        json!({
            "S.NO": 1,
            "New NO.": "B001",
            "NAME OF THE BOOK": "Test Title",
            "AUTHOR NAME": "A. Writer",
            "PUBLICATION": "Pub House"
        }),
    );
    store.insert(
        Collection::Students,
        "S100",
        json!({
            "Regno": "S100",
            "Name": "Asha Rao",
            "Email": "asha@college.edu",
            "program": "UG",
            "Education": "B.Sc Physics - II"
        }),
    );
    store.insert(
        Collection::Staff,
        "T9",
        json!({
            "StaffID": "T9",
            "Name": "Dr. Iyer",
            "Email": "iyer@college.edu",
            "Department": "Maths"
        }),
    );
    store
}

pub struct Harness {
    pub store: MemoryStore,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
}

impl Harness {
    pub async fn start(store: MemoryStore, notifier: RecordingNotifier, policy: AvailabilityPolicy) -> Self {
        let mut config = AppConfig::default();
        config.auth.admin_password_hash = hash_password(ADMIN_PASSWORD).unwrap();
        config.loans.availability_policy = policy;

        let backend: Arc<dyn CollectionStore> = Arc::new(store.clone());
        let library = Arc::new(LibraryStore::new(backend.clone()));
        library.init(None);
        library.ready().await;

        let notifier = Arc::new(notifier);
        let services = Services::new(Repository::new(backend), library, notifier.clone(), &config);

        Self {
            store,
            notifier,
            state: AppState {
                config: Arc::new(config),
                services: Arc::new(services),
            },
        }
    }

    pub fn library(&self) -> &LibraryStore {
        &self.state.services.library
    }
}

/// Poll until the condition holds or two seconds pass
pub async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
