pub mod gallery_dto;
pub mod trash_dto;
