use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::application::ports::outbound::{
    MediaIndexPort, MediaQuery, MediaRecord, MediaUpdate, MediaValues,
};
use crate::application::ports::storage_ports::{ByteReader, ByteWriter};
use crate::common::errors::{DomainError, ErrorKind};
use crate::domain::entities::photo::MediaHandle;

/// Nombre del catálogo JSON dentro de la raíz de medios
pub const INDEX_FILE_NAME: &str = "media_index.json";

/// Error específico del índice de medios local
#[derive(Debug, thiserror::Error)]
pub enum MediaIndexError {
    #[error("Media entry not found: {0}")]
    NotFound(String),

    #[error("Invalid media handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid relative path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<MediaIndexError> for DomainError {
    fn from(err: MediaIndexError) -> Self {
        match err {
            MediaIndexError::NotFound(handle) => DomainError::not_found("MediaEntry", handle),
            MediaIndexError::InvalidHandle(handle) => {
                DomainError::validation_error("MediaEntry", format!("Invalid media handle: {}", handle))
                    .with_id(handle)
            }
            MediaIndexError::InvalidPath(path) => {
                DomainError::validation_error("MediaEntry", format!("Invalid relative path: {}", path))
            }
            MediaIndexError::IoError(e) => DomainError::new(
                ErrorKind::Io,
                "MediaIndex",
                format!("IO error: {}", e),
            )
            .with_source(e),
            MediaIndexError::SerializationError(e) => {
                DomainError::index_error(format!("Catalog error: {}", e)).with_source(e)
            }
        }
    }
}

type MediaResult<T> = Result<T, MediaIndexError>;

/// Una entrada del catálogo
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MediaEntry {
    id: i64,
    display_name: String,
    mime_type: String,
    /// Folder under the media root, `/`-separated with a trailing slash; empty at the root
    relative_path: String,
    date_added: DateTime<Utc>,
    date_taken: Option<DateTime<Utc>>,
    size: i64,
    width: i32,
    height: i32,
    pending: bool,
}

impl MediaEntry {
    fn bucket_id(&self) -> Option<String> {
        let trimmed = self.relative_path.trim_end_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn to_record(&self) -> MediaRecord {
        let bucket_id = self.bucket_id();
        let bucket_display_name = bucket_id
            .as_deref()
            .and_then(|b| b.rsplit('/').next())
            .map(str::to_string);

        MediaRecord {
            id: self.id,
            display_name: self.display_name.clone(),
            date_added: self.date_added,
            date_taken: self.date_taken,
            size: self.size,
            mime_type: self.mime_type.clone(),
            width: self.width,
            height: self.height,
            bucket_id,
            bucket_display_name,
            relative_path: if self.relative_path.is_empty() {
                None
            } else {
                Some(self.relative_path.clone())
            },
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MediaCatalog {
    next_id: i64,
    entries: Vec<MediaEntry>,
}

impl MediaCatalog {
    fn allocate_id(&mut self) -> i64 {
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get(&self, id: i64) -> Option<&MediaEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn get_mut(&mut self, id: i64) -> Option<&mut MediaEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    fn contains(&self, relative_path: &str, display_name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.relative_path == relative_path && e.display_name == display_name)
    }
}

/// Changes made by [`MediaFsRepository::scan`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub added: usize,
    pub removed: usize,
}

/// Índice de medios sobre un árbol de directorios local.
///
/// Files live at `root/relative_path/display_name`; their metadata lives in a
/// JSON catalog at the root.
pub struct MediaFsRepository {
    root: PathBuf,
    index_path: PathBuf,
    catalog: RwLock<MediaCatalog>,
}

impl MediaFsRepository {
    /// Abre (o crea) el catálogo bajo `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(MediaIndexError::from)?;

        let index_path = root.join(INDEX_FILE_NAME);
        let catalog = Self::load_catalog(&index_path).await?;
        info!(
            "Media index loaded from {} with {} entries",
            index_path.display(),
            catalog.entries.len()
        );

        Ok(Self {
            root,
            index_path,
            catalog: RwLock::new(catalog),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load_catalog(index_path: &Path) -> MediaResult<MediaCatalog> {
        let content = match fs::read_to_string(index_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(MediaCatalog::default()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(MediaCatalog::default());
        }

        let mut catalog: MediaCatalog = serde_json::from_str(&content)?;
        // Guard against a hand-edited catalog reusing ids
        let max_id = catalog.entries.iter().map(|e| e.id).max().unwrap_or(0);
        catalog.next_id = catalog.next_id.max(max_id + 1);
        Ok(catalog)
    }

    /// Escribe el catálogo a un archivo temporal y lo renombra
    async fn save_catalog(&self, catalog: &MediaCatalog) -> MediaResult<()> {
        let json = serde_json::to_string_pretty(catalog)?;
        let tmp_path = self.index_path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &self.index_path).await?;
        Ok(())
    }

    /// Accepts `a/b`, `a/b/` or `` and returns `a/b/` (or `` for the root)
    fn normalize_relative_path(relative_path: &str) -> MediaResult<String> {
        let mut segments = Vec::new();
        for component in Path::new(relative_path.trim()).components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(MediaIndexError::InvalidPath(relative_path.to_string())),
            }
        }

        if segments.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("{}/", segments.join("/")))
        }
    }

    fn entry_path(&self, entry: &MediaEntry) -> PathBuf {
        let mut path = self.root.clone();
        for segment in entry.relative_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.join(&entry.display_name)
    }

    fn entry_id(handle: &MediaHandle) -> MediaResult<i64> {
        handle
            .entry_id()
            .ok_or_else(|| MediaIndexError::InvalidHandle(handle.to_string()))
    }

    /// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
    fn numbered_name(display_name: &str, n: u32) -> String {
        if n == 0 {
            return display_name.to_string();
        }
        match display_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
            _ => format!("{} ({})", display_name, n),
        }
    }

    fn image_mime_type(path: &Path) -> Option<String> {
        mime_guess::from_path(path)
            .first()
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .map(|mime| mime.essence_str().to_string())
    }

    /// Registra las imágenes encontradas en disco y descarta entradas cuyo
    /// archivo desapareció. Pending entries are left alone.
    #[instrument(skip(self))]
    pub async fn scan(&self) -> Result<ScanSummary, DomainError> {
        let mut catalog = self.catalog.write().await;
        let mut summary = ScanSummary::default();

        let before = catalog.entries.len();
        let mut kept = Vec::with_capacity(before);
        for entry in catalog.entries.drain(..) {
            if entry.pending || fs::metadata(self.entry_path(&entry)).await.is_ok() {
                kept.push(entry);
            } else {
                debug!("Dropping vanished media entry {}", entry.id);
            }
        }
        catalog.entries = kept;
        summary.removed = before - catalog.entries.len();

        let mut dirs = vec![(self.root.clone(), String::new())];
        while let Some((dir, relative_path)) = dirs.pop() {
            let mut read_dir = fs::read_dir(&dir).await.map_err(MediaIndexError::from)?;
            while let Some(item) = read_dir.next_entry().await.map_err(MediaIndexError::from)? {
                let name = item.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') || (relative_path.is_empty() && name.starts_with(INDEX_FILE_NAME)) {
                    continue;
                }

                let metadata = item.metadata().await.map_err(MediaIndexError::from)?;
                if metadata.is_dir() {
                    dirs.push((item.path(), format!("{}{}/", relative_path, name)));
                    continue;
                }
                if !metadata.is_file() || catalog.contains(&relative_path, &name) {
                    continue;
                }
                let Some(mime_type) = Self::image_mime_type(&item.path()) else {
                    continue;
                };

                let date_added = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                let id = catalog.allocate_id();
                catalog.entries.push(MediaEntry {
                    id,
                    display_name: name,
                    mime_type,
                    relative_path: relative_path.clone(),
                    date_added,
                    date_taken: None,
                    size: metadata.len() as i64,
                    width: 0,
                    height: 0,
                    pending: false,
                });
                summary.added += 1;
            }
        }

        if summary != ScanSummary::default() {
            self.save_catalog(&catalog).await?;
        }
        info!("Media scan: {} added, {} removed", summary.added, summary.removed);
        Ok(summary)
    }
}

#[async_trait]
impl MediaIndexPort for MediaFsRepository {
    async fn query(&self, query: &MediaQuery) -> Result<Vec<MediaRecord>, DomainError> {
        let catalog = self.catalog.read().await;

        let mut entries: Vec<&MediaEntry> = catalog
            .entries
            .iter()
            .filter(|e| !e.pending)
            .filter(|e| match query.bucket_id.as_deref() {
                Some(bucket_id) => e.bucket_id().as_deref() == Some(bucket_id),
                None => true,
            })
            .collect();

        entries.sort_by(|a, b| b.date_added.cmp(&a.date_added).then(b.id.cmp(&a.id)));

        Ok(entries.into_iter().map(MediaEntry::to_record).collect())
    }

    #[instrument(skip(self, values), fields(display_name = %values.display_name))]
    async fn insert(&self, values: &MediaValues) -> Result<MediaHandle, DomainError> {
        let relative_path = Self::normalize_relative_path(&values.relative_path)?;
        let mut catalog = self.catalog.write().await;

        let id = catalog.allocate_id();
        let mut entry = MediaEntry {
            id,
            display_name: values.display_name.clone(),
            mime_type: values.mime_type.clone(),
            relative_path,
            date_added: Utc::now(),
            date_taken: None,
            size: 0,
            width: values.width,
            height: values.height,
            pending: values.pending,
        };

        let target = self.entry_path(&entry);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(MediaIndexError::from)?;
        }

        // Reserve the name on disk so a concurrent scan or insert cannot take it
        let mut n = 0;
        loop {
            entry.display_name = Self::numbered_name(&values.display_name, n);
            let taken = catalog.contains(&entry.relative_path, &entry.display_name);
            if !taken {
                let path = self.entry_path(&entry);
                match OpenOptions::new().write(true).create_new(true).open(&path).await {
                    Ok(_) => break,
                    Err(e) if e.kind() == IoErrorKind::AlreadyExists => {}
                    Err(e) => return Err(MediaIndexError::from(e).into()),
                }
            }
            n += 1;
        }

        debug!("Media entry {} reserved at {}", id, self.entry_path(&entry).display());
        catalog.entries.push(entry);
        self.save_catalog(&catalog).await?;

        Ok(MediaHandle::for_id(id))
    }

    async fn open_read(&self, handle: &MediaHandle) -> Result<ByteReader, DomainError> {
        let id = Self::entry_id(handle)?;
        let path = {
            let catalog = self.catalog.read().await;
            let entry = catalog
                .get(id)
                .ok_or_else(|| MediaIndexError::NotFound(handle.to_string()))?;
            self.entry_path(entry)
        };

        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(MediaIndexError::NotFound(handle.to_string()).into()),
            Err(e) => Err(MediaIndexError::from(e).into()),
        }
    }

    async fn open_write(&self, handle: &MediaHandle) -> Result<ByteWriter, DomainError> {
        let id = Self::entry_id(handle)?;
        let path = {
            let catalog = self.catalog.read().await;
            let entry = catalog
                .get(id)
                .ok_or_else(|| MediaIndexError::NotFound(handle.to_string()))?;
            self.entry_path(entry)
        };

        let file = fs::File::create(&path).await.map_err(MediaIndexError::from)?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self))]
    async fn update(&self, handle: &MediaHandle, update: &MediaUpdate) -> Result<(), DomainError> {
        let id = Self::entry_id(handle)?;
        let mut catalog = self.catalog.write().await;

        let path = {
            let entry = catalog
                .get(id)
                .ok_or_else(|| MediaIndexError::NotFound(handle.to_string()))?;
            self.entry_path(entry)
        };
        let size = match fs::metadata(&path).await {
            Ok(metadata) => Some(metadata.len() as i64),
            Err(e) => {
                warn!("Could not stat {}: {}", path.display(), e);
                None
            }
        };

        if let Some(entry) = catalog.get_mut(id) {
            if let Some(pending) = update.pending {
                entry.pending = pending;
            }
            if let Some(size) = size {
                entry.size = size;
            }
        }

        self.save_catalog(&catalog).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, handle: &MediaHandle) -> Result<(), DomainError> {
        let id = Self::entry_id(handle)?;
        let mut catalog = self.catalog.write().await;

        let position = catalog
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| MediaIndexError::NotFound(handle.to_string()))?;

        let path = self.entry_path(&catalog.entries[position]);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => debug!("Media file already gone: {}", path.display()),
            Err(e) => {
                return Err(DomainError::index_error(format!("Failed to delete {}: {}", handle, e))
                    .with_id(handle.to_string())
                    .with_source(e))
            }
        }

        catalog.entries.remove(position);
        self.save_catalog(&catalog).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn values(name: &str, relative_path: &str) -> MediaValues {
        MediaValues {
            display_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            width: 10,
            height: 20,
            relative_path: relative_path.to_string(),
            pending: true,
        }
    }

    #[test]
    fn test_normalize_relative_path() {
        assert_eq!(MediaFsRepository::normalize_relative_path("Pictures").unwrap(), "Pictures/");
        assert_eq!(MediaFsRepository::normalize_relative_path("DCIM/Camera/").unwrap(), "DCIM/Camera/");
        assert_eq!(MediaFsRepository::normalize_relative_path("").unwrap(), "");
        assert!(MediaFsRepository::normalize_relative_path("../etc").is_err());
        assert!(MediaFsRepository::normalize_relative_path("/abs").is_err());
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(MediaFsRepository::numbered_name("a.jpg", 0), "a.jpg");
        assert_eq!(MediaFsRepository::numbered_name("a.jpg", 2), "a (2).jpg");
        assert_eq!(MediaFsRepository::numbered_name("README", 1), "README (1)");
    }

    #[tokio::test]
    async fn test_scan_registers_images_with_buckets() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("DCIM/Camera")).unwrap();
        std::fs::write(dir.path().join("DCIM/Camera/IMG_1.jpg"), [1u8, 2, 3]).unwrap();
        std::fs::write(dir.path().join("DCIM/Camera/notes.txt"), b"skip").unwrap();
        std::fs::write(dir.path().join("loose.png"), [9u8]).unwrap();

        let index = MediaFsRepository::open(dir.path()).await.unwrap();
        let summary = index.scan().await.unwrap();
        assert_eq!(summary.added, 2);

        let records = index.query(&MediaQuery::bucket("DCIM/Camera")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name, "IMG_1.jpg");
        assert_eq!(records[0].bucket_display_name.as_deref(), Some("Camera"));
        assert_eq!(records[0].size, 3);

        let all = index.query(&MediaQuery::all()).await.unwrap();
        let loose = all.iter().find(|r| r.display_name == "loose.png").unwrap();
        assert!(loose.bucket_id.is_none());

        // A second scan finds nothing new
        assert_eq!(index.scan().await.unwrap(), ScanSummary::default());
    }

    #[tokio::test]
    async fn test_catalog_survives_reopen() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), [1u8]).unwrap();
        {
            let index = MediaFsRepository::open(dir.path()).await.unwrap();
            index.scan().await.unwrap();
        }

        let reopened = MediaFsRepository::open(dir.path()).await.unwrap();
        assert_eq!(reopened.query(&MediaQuery::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_entry_hidden_until_finalized() {
        let dir = TempDir::new().unwrap();
        let index = MediaFsRepository::open(dir.path()).await.unwrap();

        let handle = index.insert(&values("a.jpg", "Pictures/Restored")).await.unwrap();
        assert!(index.query(&MediaQuery::all()).await.unwrap().is_empty());

        let mut writer = index.open_write(&handle).await.unwrap();
        writer.write_all(&[7, 7, 7, 7]).await.unwrap();
        writer.shutdown().await.unwrap();
        index.update(&handle, &MediaUpdate { pending: Some(false) }).await.unwrap();

        let records = index.query(&MediaQuery::all()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, 4);
        assert_eq!(records[0].relative_path.as_deref(), Some("Pictures/Restored/"));

        let mut bytes = Vec::new();
        index.open_read(&handle).await.unwrap().read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes, vec![7, 7, 7, 7]);
    }

    #[tokio::test]
    async fn test_query_returns_newest_first() {
        let dir = TempDir::new().unwrap();
        let index = MediaFsRepository::open(dir.path()).await.unwrap();

        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            let handle = index.insert(&values(name, "Pictures/")).await.unwrap();
            index.update(&handle, &MediaUpdate { pending: Some(false) }).await.unwrap();
        }

        let names: Vec<String> = index
            .query(&MediaQuery::bucket("Pictures"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["c.jpg", "b.jpg", "a.jpg"]);
    }

    #[tokio::test]
    async fn test_insert_disambiguates_name_clash() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("Pictures")).unwrap();
        std::fs::write(dir.path().join("Pictures/a.jpg"), [1u8]).unwrap();
        let index = MediaFsRepository::open(dir.path()).await.unwrap();

        let first = index.insert(&values("a.jpg", "Pictures/")).await.unwrap();
        let second = index.insert(&values("a.jpg", "Pictures/")).await.unwrap();
        assert_ne!(first, second);

        assert!(dir.path().join("Pictures/a (1).jpg").exists());
        assert!(dir.path().join("Pictures/a (2).jpg").exists());
        assert_eq!(std::fs::read(dir.path().join("Pictures/a.jpg")).unwrap(), vec![1u8]);
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_entry() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("gone.jpg"), [1u8]).unwrap();
        let index = MediaFsRepository::open(dir.path()).await.unwrap();
        index.scan().await.unwrap();

        let id = index.query(&MediaQuery::all()).await.unwrap()[0].id;
        let handle = MediaHandle::for_id(id);
        index.delete(&handle).await.unwrap();

        assert!(!dir.path().join("gone.jpg").exists());
        assert!(index.query(&MediaQuery::all()).await.unwrap().is_empty());
        assert!(index.delete(&handle).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_foreign_handle_is_rejected() {
        let dir = TempDir::new().unwrap();
        let index = MediaFsRepository::open(dir.path()).await.unwrap();

        let err = index.open_read(&MediaHandle::new("content://other/1")).await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
}
