//! PostgreSQL backed collection store
//!
//! Documents live in a single JSONB table keyed by (collection, id). A row
//! trigger publishes the collection name on the `collection_changes` channel
//! and each subscription re-reads its collection when it hears its name.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgListener, PgPool, PgPoolOptions};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Collection, CollectionStore, Document, SnapshotEvent, StoreError, StoreResult, Subscription};
use crate::config::StoreConfig;

const CHANGES_CHANNEL: &str = "collection_changes";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            // insufficient_privilege
            sqlx::Error::Database(db) if db.code().as_deref() == Some("42501") => {
                StoreError::PermissionDenied(db.message().to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the store section of the configuration
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the documents table and its change trigger
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Migration failed: {}", e)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn snapshot(pool: &PgPool, collection: Collection) -> StoreResult<Vec<Document>> {
    let rows = sqlx::query_as::<_, (String, Value)>(
        "SELECT id, data FROM documents WHERE collection = $1 ORDER BY id",
    )
    .bind(collection.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id, data)| Document::new(id, data)).collect())
}

/// Feed snapshots of one collection into a subscription until the receiver goes away
async fn forward_changes(
    pool: &PgPool,
    collection: Collection,
    tx: &mpsc::UnboundedSender<SnapshotEvent>,
) -> StoreResult<()> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGES_CHANNEL).await?;

    if tx.send(snapshot(pool, collection).await).is_err() {
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tx.closed() => return Ok(()),
            notification = listener.recv() => {
                let notification = notification?;
                if notification.payload() != collection.as_str() {
                    continue;
                }
                tracing::debug!(collection = %collection, "Change notification received");
                if tx.send(snapshot(pool, collection).await).is_err() {
                    return Ok(());
                }
            }
        }
    }
}

#[async_trait]
impl CollectionStore for PgStore {
    fn subscribe(&self, collection: Collection) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let pool = self.pool.clone();

        tokio::spawn(async move {
            if let Err(e) = forward_changes(&pool, collection, &tx).await {
                tracing::error!(collection = %collection, error = %e, "Change listener stopped");
                let _ = tx.send(Err(e));
            }
        });

        rx
    }

    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        snapshot(&self.pool, collection).await
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, (String, Value)>(
            "SELECT id, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, data)| Document::new(id, data)))
    }

    async fn set(&self, collection: Collection, id: &str, data: Map<String, Value>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Value::Object(data))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn add(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(Value::Object(data))
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
