use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::common::errors::DomainError;
use crate::domain::entities::trashed_photo::TrashedPhoto;

#[derive(Debug, thiserror::Error)]
pub enum TrashRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Corrupt ledger row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

pub type TrashRepositoryResult<T> = Result<T, TrashRepositoryError>;

impl From<TrashRepositoryError> for DomainError {
    fn from(err: TrashRepositoryError) -> Self {
        match err {
            TrashRepositoryError::DatabaseError(e) => {
                DomainError::store_error(format!("Database error: {}", e)).with_source(e)
            }
            TrashRepositoryError::CorruptRow { id, reason } => {
                DomainError::store_error(format!("Corrupt ledger row {}: {}", id, reason))
                    .with_id(id.to_string())
            }
        }
    }
}

/// Live view of the ledger: the current contents first, then a fresh snapshot
/// after every change. Snapshots are ordered by trash time, newest first.
pub type TrashFeed = BoxStream<'static, Vec<TrashedPhoto>>;

/// Durable ledger of trashed photos.
///
/// Point lookups return `Ok(None)` on a miss and deletes of missing rows are
/// no-ops. The store serializes writes; callers take no locks.
#[async_trait]
pub trait TrashRepository: Send + Sync + 'static {
    /// Inserts or replaces (on id conflict) a row and returns its id
    async fn insert(&self, photo: &TrashedPhoto) -> TrashRepositoryResult<i64>;

    /// Push-based view of every row
    async fn find_all(&self) -> TrashRepositoryResult<TrashFeed>;

    /// One-shot snapshot, newest first
    async fn list_all(&self) -> TrashRepositoryResult<Vec<TrashedPhoto>>;

    async fn find_by_id(&self, id: i64) -> TrashRepositoryResult<Option<TrashedPhoto>>;

    async fn find_by_original_photo_id(&self, original_photo_id: i64) -> TrashRepositoryResult<Option<TrashedPhoto>>;

    async fn delete(&self, photo: &TrashedPhoto) -> TrashRepositoryResult<()>;

    async fn delete_by_id(&self, id: i64) -> TrashRepositoryResult<()>;

    async fn delete_all(&self) -> TrashRepositoryResult<()>;

    async fn count(&self) -> TrashRepositoryResult<u64>;

    /// Rows trashed strictly before `cutoff`
    async fn find_older_than(&self, cutoff: DateTime<Utc>) -> TrashRepositoryResult<Vec<TrashedPhoto>>;

    /// Deletes rows trashed strictly before `cutoff`, returning how many went
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> TrashRepositoryResult<u64>;
}
