pub mod dtos;
pub mod ports;
pub mod services;
pub mod transactions;

// Re-exportaciones para facilitar el acceso a los principales puertos
pub use ports::inbound::{GalleryUseCase, MediaCatalogUseCase};
pub use ports::outbound::MediaIndexPort;
pub use ports::storage_ports::TrashStoragePort;
pub use ports::trash_ports::TrashUseCase;
