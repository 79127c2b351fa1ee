use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const HANDLE_PREFIX: &str = "media://images/";

/// Opaque location handle of an entry in the media index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHandle(String);

impl MediaHandle {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Handle for the index entry with the given numeric id
    pub fn for_id(id: i64) -> Self {
        Self(format!("{}{}", HANDLE_PREFIX, id))
    }

    /// Numeric id encoded in the handle, if it was built by [`MediaHandle::for_id`]
    pub fn entry_id(&self) -> Option<i64> {
        self.0.strip_prefix(HANDLE_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MediaHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Snapshot of a photo as reported by the media index. Never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub uri: MediaHandle,
    pub display_name: String,
    pub date_added: DateTime<Utc>,
    pub date_taken: Option<DateTime<Utc>>,
    pub size: i64,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub bucket_id: String,
    pub bucket_display_name: String,
    pub relative_path: Option<String>,
}
