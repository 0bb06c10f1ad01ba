//! Storage layer.
//!
//! [`PhoneStore`] is the seam between the HTTP handlers and the document
//! collection. [`PgStore`] is the production backend; [`MemoryStore`] keeps
//! records in process for tests and local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{PhoneChanges, PhoneFilter, PhoneRecord, RecordId};
use crate::schema::PhoneNumber;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid data in database (e.g., unknown status value).
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type SharedStore = Arc<dyn PhoneStore>;

/// Operations on the single phone-number collection.
///
/// Implementations must be safe to call from concurrent requests. None of
/// them retry: a failure is returned to the caller as is.
#[async_trait]
pub trait PhoneStore: Send + Sync {
    /// Matching records in natural order, truncated to `limit` when given.
    async fn find(
        &self,
        filter: &PhoneFilter,
        limit: Option<i64>,
    ) -> Result<Vec<PhoneRecord>, StoreError>;

    /// Inserts a validated record, stamping both timestamps with `now`.
    async fn insert(&self, record: &PhoneNumber, now: DateTime<Utc>)
        -> Result<RecordId, StoreError>;

    /// Applies a non-empty change set and sets `updated_at = now`.
    /// Returns the number of modified records (0 or 1).
    async fn update(
        &self,
        id: RecordId,
        changes: &PhoneChanges,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Returns the number of deleted records (0 or 1).
    async fn delete(&self, id: RecordId) -> Result<u64, StoreError>;

    /// Names of the collections visible to this connection.
    async fn collection_names(&self) -> Result<Vec<String>, StoreError>;
}
