use async_trait::async_trait;

use crate::application::dtos::gallery_dto::{GalleryQuery, GallerySnapshot, PhotoDeletion};
use crate::common::errors::DomainError;
use crate::domain::entities::album::Album;
use crate::domain::entities::photo::Photo;

/// Puerto primario de lectura del catálogo de fotos
#[async_trait]
pub trait MediaCatalogUseCase: Send + Sync + 'static {
    /// Albums grouped by folder, largest first
    async fn load_albums(&self) -> Result<Vec<Album>, DomainError>;

    /// Every photo, most recently added first
    async fn load_all_photos(&self) -> Result<Vec<Photo>, DomainError>;

    /// Photos of one folder, most recently added first
    async fn load_photos_from_album(&self, bucket_id: &str) -> Result<Vec<Photo>, DomainError>;
}

/// Puerto primario para la sesión de galería
#[async_trait]
pub trait GalleryUseCase: Send + Sync + 'static {
    async fn load_gallery(&self, query: &GalleryQuery) -> Result<GallerySnapshot, DomainError>;

    /// Moves `photo` to trash and reloads the gallery for the same query
    async fn delete_photo(&self, query: &GalleryQuery, photo: &Photo) -> Result<PhotoDeletion, DomainError>;
}
