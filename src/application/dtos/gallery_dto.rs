use serde::{Deserialize, Serialize};

use crate::application::dtos::trash_dto::MoveToTrashOutcome;
use crate::domain::entities::album::Album;
use crate::domain::entities::photo::Photo;

/// Session-scoped gallery selection, passed into every gallery call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryQuery {
    /// Selected album; `None` shows every photo
    pub bucket_id: Option<String>,
}

impl GalleryQuery {
    pub fn all_photos() -> Self {
        Self { bucket_id: None }
    }

    pub fn album(bucket_id: impl Into<String>) -> Self {
        Self { bucket_id: Some(bucket_id.into()) }
    }
}

/// Everything a gallery screen renders for one query
#[derive(Debug, Clone, Serialize)]
pub struct GallerySnapshot {
    pub photos: Vec<Photo>,
    pub current_album: Option<Album>,
    pub all_albums: Vec<Album>,
    pub trash_count: u64,
}

impl GallerySnapshot {
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Result of deleting a photo from the gallery
#[derive(Debug, Clone, Serialize)]
pub struct PhotoDeletion {
    pub outcome: MoveToTrashOutcome,
    pub gallery: GallerySnapshot,
}
