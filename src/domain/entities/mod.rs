pub mod album;
pub mod photo;
pub mod trashed_photo;
