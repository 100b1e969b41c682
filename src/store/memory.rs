//! In-process collection store
//!
//! Keeps documents in memory and pushes a fresh snapshot to every live
//! subscriber after each write. Access to a collection can be denied to
//! reproduce store access rules, and the whole store can be taken offline to
//! reproduce failing writes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Collection, CollectionStore, Document, SnapshotEvent, StoreError, StoreResult, Subscription};

#[derive(Default)]
struct Inner {
    documents: HashMap<Collection, BTreeMap<String, Map<String, Value>>>,
    subscribers: HashMap<Collection, Vec<mpsc::UnboundedSender<SnapshotEvent>>>,
    denied: HashSet<Collection>,
    offline: bool,
}

impl Inner {
    fn snapshot(&self, collection: Collection) -> Vec<Document> {
        self.documents
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), Value::Object(data.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_access(&self, collection: Collection) -> StoreResult<()> {
        if self.denied.contains(&collection) {
            return Err(permission_denied(collection));
        }
        Ok(())
    }

    fn check_available(&self, collection: Collection) -> StoreResult<()> {
        self.check_access(collection)?;
        if self.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    /// Push the current snapshot to live subscribers, dropping closed ones
    fn publish(&mut self, collection: Collection) {
        let snapshot = self.snapshot(collection);
        if let Some(subscribers) = self.subscribers.get_mut(&collection) {
            subscribers.retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
        }
    }
}

fn permission_denied(collection: Collection) -> StoreError {
    StoreError::PermissionDenied(format!("missing or insufficient permissions for {}", collection))
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a document directly, bypassing access checks
    pub fn insert(&self, collection: Collection, id: &str, data: Value) {
        let mut inner = self.lock();
        let fields = match data {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), other);
                fields
            }
        };
        inner
            .documents
            .entry(collection)
            .or_default()
            .insert(id.to_string(), fields);
        inner.publish(collection);
    }

    /// Deny access to a collection. Live subscribers receive a
    /// permission error and their subscription ends.
    pub fn deny(&self, collection: Collection) {
        let mut inner = self.lock();
        inner.denied.insert(collection);
        if let Some(subscribers) = inner.subscribers.remove(&collection) {
            for tx in subscribers {
                let _ = tx.send(Err(permission_denied(collection)));
            }
        }
    }

    pub fn allow(&self, collection: Collection) {
        self.lock().denied.remove(&collection);
    }

    /// While offline, reads and writes fail; live subscriptions stay open
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of open subscriptions on a collection
    pub fn subscriber_count(&self, collection: Collection) -> usize {
        let mut inner = self.lock();
        match inner.subscribers.get_mut(&collection) {
            Some(subscribers) => {
                subscribers.retain(|tx| !tx.is_closed());
                subscribers.len()
            }
            None => 0,
        }
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.lock().documents.get(&collection).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    fn subscribe(&self, collection: Collection) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();

        if let Err(e) = inner.check_access(collection) {
            // The subscription ends right after reporting the error
            let _ = tx.send(Err(e));
            return rx;
        }

        if tx.send(Ok(inner.snapshot(collection))).is_ok() {
            inner.subscribers.entry(collection).or_default().push(tx);
        }
        rx
    }

    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let inner = self.lock();
        inner.check_available(collection)?;
        Ok(inner.snapshot(collection))
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let inner = self.lock();
        inner.check_available(collection)?;
        Ok(inner
            .documents
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, Value::Object(data.clone()))))
    }

    async fn set(&self, collection: Collection, id: &str, data: Map<String, Value>) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check_available(collection)?;
        inner
            .documents
            .entry(collection)
            .or_default()
            .insert(id.to_string(), data);
        inner.publish(collection);
        Ok(())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check_available(collection)?;
        let doc = inner
            .documents
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        doc.extend(fields);
        inner.publish(collection);
        Ok(())
    }

    async fn add(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<String> {
        let mut inner = self.lock();
        inner.check_available(collection)?;
        let id = Uuid::new_v4().simple().to_string();
        inner
            .documents
            .entry(collection)
            .or_default()
            .insert(id.clone(), data);
        inner.publish(collection);
        Ok(id)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check_available(collection)?;
        let removed = inner
            .documents
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            inner.publish(collection);
        }
        Ok(())
    }
}
