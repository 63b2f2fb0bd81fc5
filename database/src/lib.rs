use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use threadsense_core::{CoreError, DatabaseError, ExtractedRecord};
use tracing::{debug, info};

mod memory;

pub use memory::MemoryGateway;

/// Document store contract the analysis pipeline depends on. Records are
/// keyed by their platform id; writes are last-write-wins.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn exists(&self, id: &str) -> Result<bool, CoreError>;
    async fn upsert(&self, record: &ExtractedRecord) -> Result<(), CoreError>;
    async fn get(&self, id: &str) -> Result<Option<ExtractedRecord>, CoreError>;
    async fn count(&self) -> Result<u64, CoreError>;
}

pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: format!("invalid connection string {}: {}", self.connection_string, e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to database {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool()?)
            .await
            .map_err(|e| DatabaseError::MigrationFailed {
                migration: e.to_string(),
            })?;
        debug!("Database migrations applied");
        Ok(())
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool.as_ref().ok_or_else(|| {
            DatabaseError::ConnectionFailed {
                reason: "database is not connected".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl PersistenceGateway for Database {
    async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        let row = sqlx::query("SELECT 1 FROM records WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(self.pool()?)
            .await
            .map_err(DatabaseError::from)?;
        Ok(row.is_some())
    }

    async fn upsert(&self, record: &ExtractedRecord) -> Result<(), CoreError> {
        let document = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO records (id, document, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
        )
        .bind(&record.id)
        .bind(document)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool()?)
        .await
        .map_err(DatabaseError::from)?;

        debug!(id = %record.id, analyses = record.analyses.len(), "Upserted record");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ExtractedRecord>, CoreError> {
        let row = sqlx::query("SELECT document FROM records WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool()?)
            .await
            .map_err(DatabaseError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let document: String = row.try_get("document").map_err(DatabaseError::from)?;
        let record = serde_json::from_str(&document).map_err(|_| DatabaseError::CorruptRecord {
            id: id.to_string(),
        })?;
        Ok(Some(record))
    }

    async fn count(&self) -> Result<u64, CoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(self.pool()?)
            .await
            .map_err(DatabaseError::from)?;
        Ok(count as u64)
    }
}
