pub mod trash_cleanup_service;

pub use trash_cleanup_service::TrashCleanupService;
