//! FastPhoto trash core: a durable trash ledger, the move/restore/purge
//! lifecycle around it and a read-only view of the photo catalog.

// Exportar los módulos principales del proyecto
pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;

// Re-exportaciones públicas comunes
pub use application::services::{GalleryService, MediaCatalogService, TrashService};
pub use common::config::AppConfig;
pub use common::errors::{DomainError, ErrorKind};
pub use infrastructure::repositories::{MediaFsRepository, TrashFsStorage, TrashSqliteRepository};
pub use infrastructure::services::TrashCleanupService;
