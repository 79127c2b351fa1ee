use serde::{Deserialize, Serialize};

use crate::domain::entities::photo::MediaHandle;

/// Folder of photos, derived on every catalog read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    /// Id of the representative photo
    pub id: i64,
    pub name: String,
    pub thumbnail_uri: Option<MediaHandle>,
    pub photo_count: u32,
    pub bucket_id: String,
}
