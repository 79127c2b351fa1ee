use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::errors::DomainError;

/// Flujo de bytes de lectura
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Flujo de bytes de escritura
pub type ByteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A file found in the trash directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashFileEntry {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Puerto secundario para el área de papelera en el sistema de archivos
#[async_trait]
pub trait TrashStoragePort: Send + Sync + 'static {
    fn trash_dir(&self) -> &Path;

    /// Crea el directorio de papelera si no existe
    async fn ensure_trash_dir(&self) -> Result<(), DomainError>;

    /// Creates a brand-new trash file for `display_name`. Never overwrites an
    /// existing file: collisions get a disambiguating counter in the name.
    async fn create_trash_file(
        &self,
        display_name: &str,
        trashed_at: DateTime<Utc>,
    ) -> Result<(PathBuf, ByteWriter), DomainError>;

    /// `NotFound` when the file is gone, `AccessDenied` outside the trash directory
    async fn open_trash_file(&self, path: &Path) -> Result<ByteReader, DomainError>;

    /// Removes a trash file. `Ok(false)` when it was already gone.
    async fn remove_file(&self, path: &Path) -> Result<bool, DomainError>;

    /// Regular files directly under the trash directory
    async fn list_files(&self) -> Result<Vec<TrashFileEntry>, DomainError>;
}
