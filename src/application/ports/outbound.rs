use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::ports::storage_ports::{ByteReader, ByteWriter};
use crate::common::errors::DomainError;
use crate::domain::entities::photo::MediaHandle;

/// Default folder for restored photos whose original location is unknown
pub const DEFAULT_RELATIVE_PATH: &str = "Pictures/";

/// Filter for a media index query. Results always come newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaQuery {
    /// Restrict to one folder; `None` means every image
    pub bucket_id: Option<String>,
}

impl MediaQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn bucket(bucket_id: impl Into<String>) -> Self {
        Self {
            bucket_id: Some(bucket_id.into()),
        }
    }
}

/// Raw row returned by the media index. Folder columns may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    pub display_name: String,
    pub date_added: DateTime<Utc>,
    pub date_taken: Option<DateTime<Utc>>,
    pub size: i64,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub bucket_id: Option<String>,
    pub bucket_display_name: Option<String>,
    pub relative_path: Option<String>,
}

/// Values for a new index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaValues {
    pub display_name: String,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub relative_path: String,
    /// Pending entries are hidden from queries until finalized
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaUpdate {
    pub pending: Option<bool>,
}

/// Puerto secundario hacia el índice de medios de la plataforma.
///
/// A delete that needs an interactive grant fails with `ErrorKind::AccessDenied`;
/// the confirmation flow itself is the caller's concern.
#[async_trait]
pub trait MediaIndexPort: Send + Sync + 'static {
    async fn query(&self, query: &MediaQuery) -> Result<Vec<MediaRecord>, DomainError>;

    async fn insert(&self, values: &MediaValues) -> Result<MediaHandle, DomainError>;

    async fn open_read(&self, handle: &MediaHandle) -> Result<ByteReader, DomainError>;

    async fn open_write(&self, handle: &MediaHandle) -> Result<ByteWriter, DomainError>;

    async fn update(&self, handle: &MediaHandle, update: &MediaUpdate) -> Result<(), DomainError>;

    async fn delete(&self, handle: &MediaHandle) -> Result<(), DomainError>;
}
