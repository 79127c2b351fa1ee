use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::application::ports::inbound::MediaCatalogUseCase;
use crate::application::ports::outbound::{MediaIndexPort, MediaQuery, MediaRecord};
use crate::common::errors::DomainError;
use crate::domain::entities::album::Album;
use crate::domain::entities::photo::{MediaHandle, Photo};

const UNKNOWN_BUCKET_NAME: &str = "Unknown";

/// Read-only queries over the media index. Holds no state between calls.
pub struct MediaCatalogService {
    media_index: Arc<dyn MediaIndexPort>,
}

impl MediaCatalogService {
    pub fn new(media_index: Arc<dyn MediaIndexPort>) -> Self {
        Self { media_index }
    }

    fn to_photo(record: MediaRecord) -> Photo {
        Photo {
            id: record.id,
            uri: MediaHandle::for_id(record.id),
            display_name: record.display_name,
            date_added: record.date_added,
            date_taken: record.date_taken,
            size: record.size,
            mime_type: record.mime_type,
            width: record.width,
            height: record.height,
            bucket_id: record.bucket_id.unwrap_or_default(),
            bucket_display_name: record
                .bucket_display_name
                .unwrap_or_else(|| UNKNOWN_BUCKET_NAME.to_string()),
            relative_path: record.relative_path,
        }
    }

    /// Groups rows by folder in one pass. The first row seen in a folder becomes
    /// its cover; rows without a folder are skipped.
    fn group_albums(records: &[MediaRecord]) -> Vec<Album> {
        let mut order: Vec<String> = Vec::new();
        let mut albums: HashMap<String, Album> = HashMap::new();

        for record in records {
            let Some(bucket_id) = record.bucket_id.as_ref() else {
                continue;
            };

            match albums.get_mut(bucket_id) {
                Some(album) => album.photo_count += 1,
                None => {
                    order.push(bucket_id.clone());
                    albums.insert(
                        bucket_id.clone(),
                        Album {
                            id: record.id,
                            name: record
                                .bucket_display_name
                                .clone()
                                .unwrap_or_else(|| UNKNOWN_BUCKET_NAME.to_string()),
                            thumbnail_uri: Some(MediaHandle::for_id(record.id)),
                            photo_count: 1,
                            bucket_id: bucket_id.clone(),
                        },
                    );
                }
            }
        }

        let mut result: Vec<Album> = order
            .into_iter()
            .filter_map(|bucket_id| albums.remove(&bucket_id))
            .collect();
        // Stable: ties keep first-seen order
        result.sort_by(|a, b| b.photo_count.cmp(&a.photo_count));
        result
    }
}

#[async_trait]
impl MediaCatalogUseCase for MediaCatalogService {
    #[instrument(skip(self))]
    async fn load_albums(&self) -> Result<Vec<Album>, DomainError> {
        let records = self.media_index.query(&MediaQuery::all()).await?;
        let albums = Self::group_albums(&records);
        debug!("Loaded {} albums from {} photos", albums.len(), records.len());
        Ok(albums)
    }

    #[instrument(skip(self))]
    async fn load_all_photos(&self) -> Result<Vec<Photo>, DomainError> {
        let records = self.media_index.query(&MediaQuery::all()).await?;
        debug!("Loaded {} photos", records.len());
        Ok(records.into_iter().map(Self::to_photo).collect())
    }

    #[instrument(skip(self))]
    async fn load_photos_from_album(&self, bucket_id: &str) -> Result<Vec<Photo>, DomainError> {
        let records = self.media_index.query(&MediaQuery::bucket(bucket_id)).await?;
        debug!("Loaded {} photos from album {}", records.len(), bucket_id);
        Ok(records.into_iter().map(Self::to_photo).collect())
    }
}
