pub mod sqlite;

use crate::results::JobRecord;
use async_trait::async_trait;
use thiserror::Error;

pub use sqlite::SqliteSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to encode job document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What an upsert did to the primary collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Failed(String),
}

impl UpsertOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, UpsertOutcome::Inserted | UpsertOutcome::Updated)
    }
}

/// Destination for scraped jobs
///
/// Records are keyed by their reference URL (or a synthetic identifier
/// when they have none) and written to the primary collection and to a
/// collection named after their location. Implementations must tolerate
/// concurrent callers.
#[async_trait]
pub trait JobSink: Send + Sync + 'static {
    /// Inserts or replaces `record` in every collection it belongs to
    async fn upsert(&self, record: &JobRecord) -> UpsertOutcome;

    /// Identifiers of every job already in the primary collection
    async fn known_identifiers(&self) -> Result<Vec<String>, SinkError>;

    /// Releases the underlying connection
    async fn close(&self);
}
