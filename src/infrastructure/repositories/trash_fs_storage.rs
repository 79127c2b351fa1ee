use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, OpenOptions};
use tracing::{debug, instrument, warn};

use crate::application::ports::storage_ports::{ByteReader, ByteWriter, TrashFileEntry, TrashStoragePort};
use crate::common::config::TrashConfig;
use crate::common::errors::{DomainError, Result};
use crate::domain::services::trash_path_service::TrashPathService;

/// Directorio privado de la papelera en el sistema de archivos local
pub struct TrashFsStorage {
    paths: TrashPathService,
    max_name_attempts: u32,
}

impl TrashFsStorage {
    pub fn new(trash_dir: impl Into<PathBuf>, config: &TrashConfig) -> Self {
        Self {
            paths: TrashPathService::new(trash_dir),
            max_name_attempts: config.max_name_attempts.max(1),
        }
    }

    fn io_error(action: &str, path: &Path, e: std::io::Error) -> DomainError {
        DomainError::io_error("TrashFile", format!("Failed to {} {}: {}", action, path.display(), e))
            .with_id(path.display().to_string())
            .with_source(e)
    }

    /// Only files directly inside the trash directory are ever touched
    fn guard(&self, path: &Path) -> Result<()> {
        if self.paths.is_in_trash(path) {
            Ok(())
        } else {
            Err(DomainError::access_denied(
                "TrashFile",
                format!("{} is outside the trash directory", path.display()),
            ))
        }
    }
}

#[async_trait]
impl TrashStoragePort for TrashFsStorage {
    fn trash_dir(&self) -> &Path {
        self.paths.trash_dir()
    }

    async fn ensure_trash_dir(&self) -> Result<()> {
        let dir = self.paths.trash_dir();
        fs::create_dir_all(dir)
            .await
            .map_err(|e| Self::io_error("create trash directory", dir, e))
    }

    #[instrument(skip(self))]
    async fn create_trash_file(&self, display_name: &str, trashed_at: DateTime<Utc>) -> Result<(PathBuf, ByteWriter)> {
        let millis = trashed_at.timestamp_millis();

        for attempt in 0..self.max_name_attempts {
            let path = self.paths.candidate_path(millis, display_name, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => {
                    debug!("Archivo de papelera creado: {}", path.display());
                    return Ok((path, Box::new(file) as ByteWriter));
                }
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                    debug!("Nombre ocupado en papelera: {}", path.display());
                }
                Err(e) => return Err(Self::io_error("create", &path, e)),
            }
        }

        warn!(
            "No free trash name for {} after {} attempts",
            display_name, self.max_name_attempts
        );
        Err(DomainError::already_exists(
            "TrashFile",
            TrashPathService::file_name(millis, display_name, 0),
        ))
    }

    async fn open_trash_file(&self, path: &Path) -> Result<ByteReader> {
        self.guard(path)?;
        match fs::File::open(path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(DomainError::not_found("TrashFile", path.display().to_string()))
            }
            Err(e) => Err(Self::io_error("open", path, e)),
        }
    }

    async fn remove_file(&self, path: &Path) -> Result<bool> {
        self.guard(path)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error("remove", path, e)),
        }
    }

    async fn list_files(&self) -> Result<Vec<TrashFileEntry>> {
        let dir = self.paths.trash_dir();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error("list", dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::io_error("list", dir, e))? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Removed between listing and stat
                Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                Err(e) => return Err(Self::io_error("stat", &entry.path(), e)),
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata
                .modified()
                .map_err(|e| Self::io_error("read mtime of", &entry.path(), e))?;
            files.push(TrashFileEntry {
                path: entry.path(),
                modified: DateTime::<Utc>::from(modified),
            });
        }

        Ok(files)
    }
}
