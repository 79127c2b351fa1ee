use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::application::dtos::gallery_dto::{GalleryQuery, GallerySnapshot, PhotoDeletion};
use crate::application::ports::inbound::{GalleryUseCase, MediaCatalogUseCase};
use crate::application::ports::trash_ports::TrashUseCase;
use crate::common::errors::DomainError;
use crate::domain::entities::photo::Photo;

/// Builds gallery snapshots from the catalog and the trash.
///
/// The selected album travels in each [`GalleryQuery`]; nothing about the
/// session is kept here.
pub struct GalleryService {
    catalog: Arc<dyn MediaCatalogUseCase>,
    trash: Arc<dyn TrashUseCase>,
}

impl GalleryService {
    pub fn new(catalog: Arc<dyn MediaCatalogUseCase>, trash: Arc<dyn TrashUseCase>) -> Self {
        Self { catalog, trash }
    }
}

#[async_trait]
impl GalleryUseCase for GalleryService {
    #[instrument(skip(self))]
    async fn load_gallery(&self, query: &GalleryQuery) -> Result<GallerySnapshot, DomainError> {
        let all_albums = self.catalog.load_albums().await?;

        let photos = match query.bucket_id.as_deref() {
            Some(bucket_id) => self.catalog.load_photos_from_album(bucket_id).await?,
            None => self.catalog.load_all_photos().await?,
        };

        let current_album = query
            .bucket_id
            .as_ref()
            .and_then(|bucket_id| all_albums.iter().find(|a| &a.bucket_id == bucket_id).cloned());

        let trash_count = self.trash.trash_count().await?;

        debug!(
            "Gallery loaded: {} photos, {} albums, {} in trash",
            photos.len(),
            all_albums.len(),
            trash_count
        );

        Ok(GallerySnapshot {
            photos,
            current_album,
            all_albums,
            trash_count,
        })
    }

    #[instrument(skip(self, photo), fields(photo_id = photo.id))]
    async fn delete_photo(&self, query: &GalleryQuery, photo: &Photo) -> Result<PhotoDeletion, DomainError> {
        let outcome = self.trash.move_to_trash(photo).await?;
        let gallery = self.load_gallery(query).await?;
        Ok(PhotoDeletion { outcome, gallery })
    }
}
