use crate::results::JobRecord;
use crate::sink::{JobSink, SinkError, UpsertOutcome};
use crate::utils::{location_collection_name, synthetic_identifier};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Collection every job is written to
pub const PRIMARY_COLLECTION: &str = "jobs";

/// How long a connection waits on a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Job store on SQLite, one table per collection
///
/// Each table holds JSON documents keyed by job URL; the primary key keeps
/// the URL unique within every collection.
///
/// Writes go through one lock: a deferred SQLite transaction that reads
/// before it writes fails with `SQLITE_BUSY` instead of waiting when
/// another connection is writing.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
    writes: Arc<Mutex<()>>,
}

impl SqliteSink {
    /// Connects, checks the connection and creates the primary collection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, SinkError> {
        let options = SqliteConnectOptions::from_str(database_url)?.busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        let mut conn = pool.acquire().await?;
        ensure_collection(&mut conn, PRIMARY_COLLECTION).await?;

        ::log::info!("Connected to job store at {}", database_url);
        Ok(Self {
            pool,
            writes: Arc::new(Mutex::new(())),
        })
    }

    /// Number of documents in `collection`, zero if it does not exist
    pub async fn count(&self, collection: &str) -> Result<i64, SinkError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(collection)
        .fetch_one(&self.pool)
        .await?;
        if exists == 0 {
            return Ok(0);
        }

        let sql = format!(r#"SELECT COUNT(*) FROM "{}""#, collection);
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    /// Stored JSON document for `key` in `collection`
    pub async fn document(&self, collection: &str, key: &str) -> Result<Option<Value>, SinkError> {
        let sql = format!(r#"SELECT document FROM "{}" WHERE job_url = ?"#, collection);
        let row: Option<String> = sqlx::query_scalar(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }

    async fn store(&self, record: &JobRecord) -> Result<UpsertOutcome, SinkError> {
        let key = record
            .identity()
            .map(str::to_string)
            .unwrap_or_else(|| synthetic_identifier(record));
        let now = Utc::now().to_rfc3339();
        let document = job_document(record, &key, &now)?;

        let _write = self.writes.lock().await;
        let mut tx = self.pool.begin().await?;

        let outcome = upsert_into(&mut tx, PRIMARY_COLLECTION, &key, &document, &now).await?;

        if let Some(collection) = location_collection_name(&record.location) {
            let location_outcome = upsert_into(&mut tx, &collection, &key, &document, &now).await?;
            ::log::debug!(
                "Job {} in location collection '{}'",
                describe(&location_outcome),
                collection
            );
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl JobSink for SqliteSink {
    async fn upsert(&self, record: &JobRecord) -> UpsertOutcome {
        match self.store(record).await {
            Ok(outcome) => {
                ::log::info!("Job {} in store: {}", describe(&outcome), record.title);
                outcome
            }
            Err(e) => {
                ::log::error!("Error saving job '{}': {}", record.title, e);
                UpsertOutcome::Failed(e.to_string())
            }
        }
    }

    async fn known_identifiers(&self) -> Result<Vec<String>, SinkError> {
        let sql = format!(r#"SELECT job_url FROM "{}""#, PRIMARY_COLLECTION);
        Ok(sqlx::query_scalar(&sql).fetch_all(&self.pool).await?)
    }

    async fn close(&self) {
        self.pool.close().await;
        ::log::info!("Job store connection closed");
    }
}

/// JSON document stored for a record
fn job_document(record: &JobRecord, key: &str, now: &str) -> Result<String, SinkError> {
    let mut document = serde_json::to_value(record)?;
    if let Some(fields) = document.as_object_mut() {
        fields.insert("url".to_string(), Value::String(key.to_string()));
        fields.insert("last_updated".to_string(), Value::String(now.to_string()));
    }
    Ok(document.to_string())
}

async fn ensure_collection(conn: &mut SqliteConnection, collection: &str) -> Result<(), SinkError> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{}" (
            job_url TEXT PRIMARY KEY NOT NULL,
            document TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )
        "#,
        collection
    );
    sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(())
}

async fn upsert_into(
    conn: &mut SqliteConnection,
    collection: &str,
    key: &str,
    document: &str,
    now: &str,
) -> Result<UpsertOutcome, SinkError> {
    ensure_collection(conn, collection).await?;

    let exists_sql = format!(
        r#"SELECT EXISTS(SELECT 1 FROM "{}" WHERE job_url = ?)"#,
        collection
    );
    let exists: i64 = sqlx::query_scalar(&exists_sql)
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;

    let upsert_sql = format!(
        r#"
        INSERT INTO "{}" (job_url, document, last_updated)
        VALUES (?, ?, ?)
        ON CONFLICT(job_url) DO UPDATE SET
            document = excluded.document,
            last_updated = excluded.last_updated
        "#,
        collection
    );
    sqlx::query(&upsert_sql)
        .bind(key)
        .bind(document)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(if exists != 0 {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    })
}

fn describe(outcome: &UpsertOutcome) -> &'static str {
    match outcome {
        UpsertOutcome::Inserted => "added",
        UpsertOutcome::Updated => "updated",
        UpsertOutcome::Failed(_) => "not saved",
    }
}
