//! Remote collection store
//!
//! The portal keeps all of its data in four named document collections.
//! A backend offers live subscriptions (a stream of full snapshots or errors
//! per collection), point reads and writes. Documents are schemaless JSON
//! objects keyed by a string id; typed records are decoded on the way out.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Named collections mirrored by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Books,
    Students,
    Staff,
    Transactions,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Books,
        Collection::Students,
        Collection::Staff,
        Collection::Transactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Books => "books",
            Collection::Students => "students",
            Collection::Staff => "staff",
            Collection::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StoreError::Backend(format!("Unknown collection: {}", s)))
    }
}

/// Store level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document {id} not found in {collection}")]
    NotFound { collection: Collection, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Malformed document: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A raw document as held by the store
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), data }
    }

    /// Decode into a typed record. The document id is exposed to the record
    /// as its `id` field, next to the stored fields.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = match &self.data {
            Value::Object(fields) => fields.clone(),
            _ => {
                return Err(StoreError::Decode(format!(
                    "document {} is not an object",
                    self.id
                )))
            }
        };
        fields.insert("id".to_string(), Value::String(self.id.clone()));

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::Decode(format!("document {}: {}", self.id, e)))
    }
}

/// Serialize a record into document fields. The record's `id` is never
/// written into the body; it lives in the document key.
pub fn encode<T: Serialize>(record: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(record) {
        Ok(Value::Object(mut fields)) => {
            fields.remove("id");
            Ok(fields)
        }
        Ok(_) => Err(StoreError::Decode("record is not an object".to_string())),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

/// Decode a whole snapshot, leaving out documents that do not fit the record type
pub fn decode_snapshot<T: DeserializeOwned>(collection: Collection, documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

/// One delivery from a live subscription
pub type SnapshotEvent = StoreResult<Vec<Document>>;

/// Receiving end of a live subscription. Dropping it cancels the subscription.
pub type Subscription = mpsc::UnboundedReceiver<SnapshotEvent>;

/// Document database boundary
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Open a live subscription. The first delivery is the current snapshot
    /// (or an error); every later change to the collection delivers a new
    /// full snapshot.
    fn subscribe(&self, collection: Collection) -> Subscription;

    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Document>>;

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;

    /// Upsert with full replace
    async fn set(&self, collection: Collection, id: &str, data: Map<String, Value>) -> StoreResult<()>;

    /// Merge fields into an existing document
    async fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> StoreResult<()>;

    /// Insert under a generated id
    async fn add(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<String>;

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;
}
