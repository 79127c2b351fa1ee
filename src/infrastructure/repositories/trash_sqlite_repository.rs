use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, instrument, warn};

use crate::domain::entities::photo::MediaHandle;
use crate::domain::entities::trashed_photo::TrashedPhoto;
use crate::domain::repositories::trash_repository::{
    TrashFeed, TrashRepository, TrashRepositoryError, TrashRepositoryResult,
};

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, original_photo_id, original_uri, display_name, mime_type,
        size, width, height, original_bucket_id, original_bucket_display_name,
        original_relative_path, trash_file_path, date_trashed, date_added, date_taken
    FROM trashed_photos
"#;

/// Ledger de papelera sobre SQLite.
///
/// Every successful write republishes the full ordered snapshot on a watch
/// channel, which is what `find_all` subscribers see.
pub struct TrashSqliteRepository {
    pool: Arc<SqlitePool>,
    snapshots: watch::Sender<Vec<TrashedPhoto>>,
    // Serializes read-and-send so an older read never replaces a newer snapshot
    publish_lock: Mutex<()>,
}

impl TrashSqliteRepository {
    pub async fn new(pool: Arc<SqlitePool>) -> TrashRepositoryResult<Self> {
        let (snapshots, _) = watch::channel(Vec::new());
        let repository = Self {
            pool,
            snapshots,
            publish_lock: Mutex::new(()),
        };
        repository.publish().await?;
        Ok(repository)
    }

    fn millis(value: DateTime<Utc>) -> i64 {
        value.timestamp_millis()
    }

    fn from_millis(id: i64, column: &str, millis: i64) -> TrashRepositoryResult<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis).ok_or_else(|| TrashRepositoryError::CorruptRow {
            id,
            reason: format!("{} out of range: {}", column, millis),
        })
    }

    fn row_to_trashed_photo(row: &SqliteRow) -> TrashRepositoryResult<TrashedPhoto> {
        let id: i64 = row.try_get("id")?;
        let date_taken: Option<i64> = row.try_get("date_taken")?;
        let trash_file_path: String = row.try_get("trash_file_path")?;
        let original_uri: String = row.try_get("original_uri")?;

        Ok(TrashedPhoto {
            id,
            original_photo_id: row.try_get("original_photo_id")?,
            original_uri: MediaHandle::new(original_uri),
            display_name: row.try_get("display_name")?,
            mime_type: row.try_get("mime_type")?,
            size: row.try_get("size")?,
            width: row.try_get("width")?,
            height: row.try_get("height")?,
            original_bucket_id: row.try_get("original_bucket_id")?,
            original_bucket_display_name: row.try_get("original_bucket_display_name")?,
            original_relative_path: row.try_get("original_relative_path")?,
            trash_file_path: PathBuf::from(trash_file_path),
            date_trashed: Self::from_millis(id, "date_trashed", row.try_get("date_trashed")?)?,
            date_added: Self::from_millis(id, "date_added", row.try_get("date_added")?)?,
            date_taken: date_taken
                .map(|millis| Self::from_millis(id, "date_taken", millis))
                .transpose()?,
        })
    }

    fn rows_to_trashed_photos(rows: Vec<SqliteRow>) -> TrashRepositoryResult<Vec<TrashedPhoto>> {
        rows.iter().map(Self::row_to_trashed_photo).collect()
    }

    async fn query_all(&self) -> TrashRepositoryResult<Vec<TrashedPhoto>> {
        let rows = sqlx::query(&format!("{} ORDER BY date_trashed DESC, id DESC", SELECT_COLUMNS))
            .fetch_all(&*self.pool)
            .await?;
        Self::rows_to_trashed_photos(rows)
    }

    /// Envía la instantánea actual a los suscriptores
    async fn publish(&self) -> TrashRepositoryResult<()> {
        let _guard = self.publish_lock.lock().await;
        let rows = self.query_all().await?;
        self.snapshots.send_replace(rows);
        Ok(())
    }

    /// The write already committed; a failed refresh only delays subscribers
    async fn publish_after_write(&self) {
        if let Err(e) = self.publish().await {
            warn!("Failed to refresh trash ledger snapshot: {}", e);
        }
    }
}

#[async_trait]
impl TrashRepository for TrashSqliteRepository {
    #[instrument(skip(self, photo), fields(original_photo_id = photo.original_photo_id))]
    async fn insert(&self, photo: &TrashedPhoto) -> TrashRepositoryResult<i64> {
        let id = if photo.is_persisted() { Some(photo.id) } else { None };

        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO trashed_photos (
                id, original_photo_id, original_uri, display_name, mime_type,
                size, width, height, original_bucket_id, original_bucket_display_name,
                original_relative_path, trash_file_path, date_trashed, date_added, date_taken
            ) VALUES (
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            )
            "#,
        )
        .bind(id)
        .bind(photo.original_photo_id)
        .bind(photo.original_uri.as_str())
        .bind(&photo.display_name)
        .bind(&photo.mime_type)
        .bind(photo.size)
        .bind(photo.width)
        .bind(photo.height)
        .bind(&photo.original_bucket_id)
        .bind(&photo.original_bucket_display_name)
        .bind(&photo.original_relative_path)
        .bind(photo.trash_file_path.to_string_lossy().into_owned())
        .bind(Self::millis(photo.date_trashed))
        .bind(Self::millis(photo.date_added))
        .bind(photo.date_taken.map(Self::millis))
        .execute(&*self.pool)
        .await?;

        let assigned = result.last_insert_rowid();
        debug!("Trashed photo stored with id {}", assigned);

        self.publish_after_write().await;
        Ok(assigned)
    }

    async fn find_all(&self) -> TrashRepositoryResult<TrashFeed> {
        // Refresh so a new subscriber never starts from a stale snapshot
        self.publish().await?;
        Ok(WatchStream::new(self.snapshots.subscribe()).boxed())
    }

    async fn list_all(&self) -> TrashRepositoryResult<Vec<TrashedPhoto>> {
        self.query_all().await
    }

    async fn find_by_id(&self, id: i64) -> TrashRepositoryResult<Option<TrashedPhoto>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;

        row.as_ref().map(Self::row_to_trashed_photo).transpose()
    }

    async fn find_by_original_photo_id(&self, original_photo_id: i64) -> TrashRepositoryResult<Option<TrashedPhoto>> {
        let row = sqlx::query(&format!(
            "{} WHERE original_photo_id = ? ORDER BY date_trashed DESC, id DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(original_photo_id)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(Self::row_to_trashed_photo).transpose()
    }

    async fn delete(&self, photo: &TrashedPhoto) -> TrashRepositoryResult<()> {
        self.delete_by_id(photo.id).await
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> TrashRepositoryResult<()> {
        let result = sqlx::query("DELETE FROM trashed_photos WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await?;

        if result.rows_affected() == 0 {
            debug!("Trashed photo {} already absent", id);
            return Ok(());
        }

        self.publish_after_write().await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> TrashRepositoryResult<()> {
        let result = sqlx::query("DELETE FROM trashed_photos")
            .execute(&*self.pool)
            .await?;
        debug!("Cleared {} trashed photos", result.rows_affected());

        self.publish_after_write().await;
        Ok(())
    }

    async fn count(&self) -> TrashRepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trashed_photos")
            .fetch_one(&*self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn find_older_than(&self, cutoff: DateTime<Utc>) -> TrashRepositoryResult<Vec<TrashedPhoto>> {
        let rows = sqlx::query(&format!(
            "{} WHERE date_trashed < ? ORDER BY date_trashed DESC, id DESC",
            SELECT_COLUMNS
        ))
        .bind(Self::millis(cutoff))
        .fetch_all(&*self.pool)
        .await?;

        Self::rows_to_trashed_photos(rows)
    }

    #[instrument(skip(self))]
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> TrashRepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM trashed_photos WHERE date_trashed < ?")
            .bind(Self::millis(cutoff))
            .execute(&*self.pool)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            debug!("Purged {} trashed photos older than {}", deleted, cutoff);
            self.publish_after_write().await;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use chrono::TimeZone;

    use crate::common::config::{AppConfig, StorageConfig};
    use crate::common::db::{create_in_memory_pool, create_ledger_pool};

    async fn repository() -> TrashSqliteRepository {
        let pool = create_in_memory_pool().await.unwrap();
        TrashSqliteRepository::new(Arc::new(pool)).await.unwrap()
    }

    fn trashed(original_photo_id: i64, trashed_at_millis: i64) -> TrashedPhoto {
        TrashedPhoto {
            id: 0,
            original_photo_id,
            original_uri: MediaHandle::for_id(original_photo_id),
            display_name: format!("IMG_{}.jpg", original_photo_id),
            mime_type: "image/jpeg".to_string(),
            size: 1234,
            width: 4000,
            height: 3000,
            original_bucket_id: "Pictures/Camera".to_string(),
            original_bucket_display_name: "Camera".to_string(),
            original_relative_path: Some("Pictures/Camera/".to_string()),
            trash_file_path: PathBuf::from(format!("/trash/{}_IMG_{}.jpg", trashed_at_millis, original_photo_id)),
            date_trashed: Utc.timestamp_millis_opt(trashed_at_millis).unwrap(),
            date_added: Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            date_taken: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_round_trips_metadata() {
        let repo = repository().await;
        let mut row = trashed(11, 5_000);
        row.date_taken = Some(Utc.timestamp_opt(1_500_000_000, 0).unwrap());

        let id = repo.insert(&row).await.unwrap();
        assert!(id > 0);

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        row.id = id;
        assert_eq!(stored, row);
    }

    #[tokio::test]
    async fn test_insert_replaces_on_id_conflict() {
        let repo = repository().await;
        let mut row = trashed(1, 1_000);
        row.id = repo.insert(&row).await.unwrap();

        row.display_name = "renamed.jpg".to_string();
        let id = repo.insert(&row).await.unwrap();

        assert_eq!(id, row.id);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.find_by_id(id).await.unwrap().unwrap().display_name, "renamed.jpg");
    }

    #[tokio::test]
    async fn test_lookups_return_none_when_missing() {
        let repo = repository().await;

        assert!(repo.find_by_id(99).await.unwrap().is_none());
        assert!(repo.find_by_original_photo_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_original_photo_id() {
        let repo = repository().await;
        repo.insert(&trashed(1, 1_000)).await.unwrap();
        repo.insert(&trashed(2, 2_000)).await.unwrap();

        let found = repo.find_by_original_photo_id(2).await.unwrap().unwrap();
        assert_eq!(found.original_photo_id, 2);
    }

    #[tokio::test]
    async fn test_list_all_orders_newest_first() {
        let repo = repository().await;
        repo.insert(&trashed(1, 1_000)).await.unwrap();
        repo.insert(&trashed(2, 3_000)).await.unwrap();
        repo.insert(&trashed(3, 2_000)).await.unwrap();

        let ids: Vec<i64> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.original_photo_id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_delete_missing_rows_is_not_an_error() {
        let repo = repository().await;

        repo.delete_by_id(42).await.unwrap();
        let mut ghost = trashed(5, 1_000);
        ghost.id = 77;
        repo.delete(&ghost).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_older_than_single_row() {
        let repo = repository().await;
        repo.insert(&trashed(1, 1_000)).await.unwrap();

        let cutoff = Utc.timestamp_millis_opt(2_000).unwrap();
        assert_eq!(repo.delete_older_than(cutoff).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_older_than_keeps_rows_at_cutoff() {
        let repo = repository().await;
        for (photo, at) in [(1, 500), (2, 999), (3, 1_000), (4, 1_001), (5, 5_000)] {
            repo.insert(&trashed(photo, at)).await.unwrap();
        }

        let cutoff = Utc.timestamp_millis_opt(1_000).unwrap();
        let expired = repo.find_older_than(cutoff).await.unwrap();
        assert_eq!(expired.len(), 2);

        assert_eq!(repo.delete_older_than(cutoff).await.unwrap(), 2);

        let mut left: Vec<i64> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.original_photo_id)
            .collect();
        left.sort();
        assert_eq!(left, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_delete_all_clears_ledger() {
        let repo = repository().await;
        repo.insert(&trashed(1, 1_000)).await.unwrap();
        repo.insert(&trashed(2, 2_000)).await.unwrap();

        repo.delete_all().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        // Clearing an empty ledger is fine too
        repo.delete_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_find_all_pushes_snapshots_on_change() {
        let repo = repository().await;
        let mut feed = repo.find_all().await.unwrap();

        async fn next(feed: &mut TrashFeed) -> Vec<TrashedPhoto> {
            tokio::time::timeout(StdDuration::from_secs(2), feed.next())
                .await
                .expect("feed did not push a snapshot")
                .expect("feed closed")
        }

        assert!(next(&mut feed).await.is_empty());

        let id = repo.insert(&trashed(1, 1_000)).await.unwrap();
        let snapshot = next(&mut feed).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);

        repo.delete_by_id(id).await.unwrap();
        assert!(next(&mut feed).await.is_empty());
    }

    #[tokio::test]
    async fn test_feed_ends_on_latest_state_under_concurrent_writes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage = StorageConfig::under(dir.path(), dir.path().join("media"));
        config.database.max_connections = 4;
        let pool = create_ledger_pool(&config).await.unwrap();
        let repo = Arc::new(TrashSqliteRepository::new(Arc::new(pool)).await.unwrap());

        let mut feed = repo.find_all().await.unwrap();
        assert!(feed.next().await.unwrap().is_empty());

        let writes = (1..=24).map(|n| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(&trashed(n, n * 1_000)).await.unwrap() })
        });
        for handle in futures::future::join_all(writes).await {
            handle.unwrap();
        }
        assert_eq!(repo.count().await.unwrap(), 24);

        // The feed coalesces; whatever it holds now must be the final state
        let latest = tokio::time::timeout(StdDuration::from_secs(2), feed.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.len(), 24);
        assert_eq!(latest[0].original_photo_id, 24);
    }
}
