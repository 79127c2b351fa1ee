use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::photo::{MediaHandle, Photo};

/// Ledger record of a photo sitting in the app trash.
///
/// Rows are written once by move-to-trash and never updated. `original_photo_id`
/// is a soft reference: the index entry it points to is deleted when trashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashedPhoto {
    /// Assigned by the ledger; 0 until persisted
    pub id: i64,
    pub original_photo_id: i64,
    pub original_uri: MediaHandle,
    pub display_name: String,
    pub mime_type: String,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    pub original_bucket_id: String,
    pub original_bucket_display_name: String,
    pub original_relative_path: Option<String>,
    pub trash_file_path: PathBuf,
    pub date_trashed: DateTime<Utc>,
    pub date_added: DateTime<Utc>,
    pub date_taken: Option<DateTime<Utc>>,
}

impl TrashedPhoto {
    /// Captures the full original metadata of `photo`, now living at `trash_file_path`
    pub fn from_photo(photo: &Photo, trash_file_path: PathBuf, date_trashed: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            original_photo_id: photo.id,
            original_uri: photo.uri.clone(),
            display_name: photo.display_name.clone(),
            mime_type: photo.mime_type.clone(),
            size: photo.size,
            width: photo.width,
            height: photo.height,
            original_bucket_id: photo.bucket_id.clone(),
            original_bucket_display_name: photo.bucket_display_name.clone(),
            original_relative_path: photo.relative_path.clone(),
            trash_file_path,
            date_trashed,
            date_added: photo.date_added,
            date_taken: photo.date_taken,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    pub fn trash_file(&self) -> &Path {
        &self.trash_file_path
    }

    /// Fecha en la que la limpieza automática eliminará el elemento.
    /// Saturates at the latest representable date.
    pub fn deletion_date(&self, retention_days: u32) -> DateTime<Utc> {
        Duration::try_days(retention_days as i64)
            .and_then(|retention| self.date_trashed.checked_add_signed(retention))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Rows trashed strictly before this instant are older than `max_age_days`.
    /// Saturates at the earliest representable date, which expires nothing.
    pub fn expiry_cutoff(now: DateTime<Utc>, max_age_days: u32) -> DateTime<Utc> {
        Duration::try_days(max_age_days as i64)
            .and_then(|max_age| now.checked_sub_signed(max_age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn days_until_deletion(&self, retention_days: u32, now: DateTime<Utc>) -> i64 {
        (self.deletion_date(retention_days) - now).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn photo() -> Photo {
        Photo {
            id: 7,
            uri: MediaHandle::for_id(7),
            display_name: "beach.jpg".to_string(),
            date_added: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            date_taken: None,
            size: 2048,
            mime_type: "image/jpeg".to_string(),
            width: 640,
            height: 480,
            bucket_id: "Pictures/Holidays".to_string(),
            bucket_display_name: "Holidays".to_string(),
            relative_path: Some("Pictures/Holidays/".to_string()),
        }
    }

    #[test]
    fn test_from_photo_denormalizes_metadata() {
        let now = Utc::now();
        let row = TrashedPhoto::from_photo(&photo(), PathBuf::from("/trash/1_beach.jpg"), now);

        assert!(!row.is_persisted());
        assert_eq!(row.original_photo_id, 7);
        assert_eq!(row.original_uri, MediaHandle::for_id(7));
        assert_eq!(row.original_bucket_display_name, "Holidays");
        assert_eq!(row.original_relative_path.as_deref(), Some("Pictures/Holidays/"));
        assert_eq!(row.date_trashed, now);
    }

    #[test]
    fn test_days_until_deletion_never_negative() {
        let trashed_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let row = TrashedPhoto::from_photo(&photo(), PathBuf::from("/trash/x"), trashed_at);

        let ten_days_later = trashed_at + Duration::days(10);
        assert_eq!(row.days_until_deletion(30, ten_days_later), 20);

        let long_after = trashed_at + Duration::days(45);
        assert_eq!(row.days_until_deletion(30, long_after), 0);
    }

    #[test]
    fn test_huge_retention_saturates() {
        let trashed_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let row = TrashedPhoto::from_photo(&photo(), PathBuf::from("/trash/x"), trashed_at);

        assert_eq!(row.deletion_date(u32::MAX), DateTime::<Utc>::MAX_UTC);
        assert!(row.days_until_deletion(u32::MAX, trashed_at) > 0);
    }

    #[test]
    fn test_expiry_cutoff() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(TrashedPhoto::expiry_cutoff(now, 30), now - Duration::days(30));
        assert_eq!(TrashedPhoto::expiry_cutoff(now, 0), now);
        assert_eq!(TrashedPhoto::expiry_cutoff(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
