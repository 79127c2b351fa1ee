use async_trait::async_trait;

use crate::application::dtos::trash_dto::{CleanupReport, MoveToTrashOutcome, RestoredPhoto, TrashedPhotoDto};
use crate::common::errors::Result;
use crate::domain::entities::photo::Photo;
use crate::domain::entities::trashed_photo::TrashedPhoto;
use crate::domain::repositories::trash_repository::TrashFeed;

/// Port for trash-related use cases
#[async_trait]
pub trait TrashUseCase: Send + Sync {
    /// Current trash contents, newest first
    async fn list_trash(&self) -> Result<Vec<TrashedPhotoDto>>;

    /// Live view of the trash contents
    async fn watch_trash(&self) -> Result<TrashFeed>;

    async fn trash_count(&self) -> Result<u64>;

    /// Copy a photo into the trash, record it, then drop it from the media index
    async fn move_to_trash(&self, photo: &Photo) -> Result<MoveToTrashOutcome>;

    /// Put a trashed photo back into the media index
    async fn restore_photo(&self, trashed: &TrashedPhoto) -> Result<RestoredPhoto>;

    /// Erase a trashed photo and its ledger row
    async fn delete_permanently(&self, trashed: &TrashedPhoto) -> Result<()>;

    /// Erase every trash file and clear the ledger
    async fn empty_trash(&self) -> Result<CleanupReport>;

    /// Purge rows and files older than `max_age_days`
    async fn auto_cleanup(&self, max_age_days: u32) -> Result<CleanupReport>;
}
