pub mod media_fs_repository;
pub mod trash_fs_storage;
pub mod trash_sqlite_repository;

// Re-exportar para facilitar acceso
pub use media_fs_repository::MediaFsRepository;
pub use trash_fs_storage::TrashFsStorage;
pub use trash_sqlite_repository::TrashSqliteRepository;
