use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::transactions::trash_transaction::MoveToTrashState;
use crate::domain::entities::photo::MediaHandle;
use crate::domain::entities::trashed_photo::TrashedPhoto;

/// DTO representing a photo in the trash
#[derive(Debug, Clone, Serialize)]
pub struct TrashedPhotoDto {
    pub id: i64,
    pub original_photo_id: i64,
    pub display_name: String,
    pub mime_type: String,
    pub size: i64,
    pub original_album: String,
    pub trash_file_path: PathBuf,
    pub trashed_at: DateTime<Utc>,
    pub days_until_deletion: i64,
}

impl TrashedPhotoDto {
    pub fn from_entity(photo: &TrashedPhoto, retention_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: photo.id,
            original_photo_id: photo.original_photo_id,
            display_name: photo.display_name.clone(),
            mime_type: photo.mime_type.clone(),
            size: photo.size,
            original_album: photo.original_bucket_display_name.clone(),
            trash_file_path: photo.trash_file_path.clone(),
            trashed_at: photo.date_trashed,
            days_until_deletion: photo.days_until_deletion(retention_days, now),
        }
    }
}

/// Result of moving a photo to the trash.
///
/// The copy and the ledger row are durable in both variants. With
/// `ReconciliationNeeded` the original is still in the media index, so the photo
/// exists twice until the index delete is retried.
#[derive(Debug, Clone, Serialize)]
pub enum MoveToTrashOutcome {
    Completed(TrashedPhoto),
    ReconciliationNeeded {
        trashed: TrashedPhoto,
        state: MoveToTrashState,
        reason: String,
    },
}

impl MoveToTrashOutcome {
    pub fn trashed_photo(&self) -> &TrashedPhoto {
        match self {
            MoveToTrashOutcome::Completed(trashed) => trashed,
            MoveToTrashOutcome::ReconciliationNeeded { trashed, .. } => trashed,
        }
    }

    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, MoveToTrashOutcome::ReconciliationNeeded { .. })
    }
}

/// A photo put back into the media index
#[derive(Debug, Clone, Serialize)]
pub struct RestoredPhoto {
    pub handle: MediaHandle,
    pub trashed_id: i64,
    /// False when the trash file could not be removed and is now an orphan
    pub trash_file_removed: bool,
}

/// Summary of an empty-trash or auto-cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Ledger rows removed
    pub rows_deleted: u64,
    pub files_deleted: u64,
    /// Files that could not be removed; picked up again by a later pass
    pub files_failed: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.files_failed.is_empty()
    }
}
