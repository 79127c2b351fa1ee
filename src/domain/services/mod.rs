pub mod trash_path_service;
