pub mod gallery_service;
pub mod media_catalog_service;
pub mod trash_service;


// Re-exportar para facilitar acceso
pub use gallery_service::GalleryService;
pub use media_catalog_service::MediaCatalogService;
pub use trash_service::TrashService;
