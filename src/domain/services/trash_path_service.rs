use std::path::{Path, PathBuf};

/// Fallback when a display name sanitizes down to nothing
const FALLBACK_NAME: &str = "photo";

/// Servicio de dominio para nombres de archivo dentro de la papelera, sin
/// dependencias de sistema de archivos
#[derive(Debug, Clone)]
pub struct TrashPathService {
    trash_dir: PathBuf,
}

impl TrashPathService {
    pub fn new(trash_dir: impl Into<PathBuf>) -> Self {
        Self { trash_dir: trash_dir.into() }
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    /// Reduce un nombre visible a un único segmento de ruta seguro
    pub fn sanitize_display_name(display_name: &str) -> String {
        let cleaned: String = display_name
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect();

        match cleaned.as_str() {
            "" | "." | ".." => FALLBACK_NAME.to_string(),
            _ => cleaned,
        }
    }

    /// `{millis}_{name}` on the first attempt, `{millis}_{attempt}_{name}` after a collision
    pub fn file_name(millis: i64, display_name: &str, attempt: u32) -> String {
        let name = Self::sanitize_display_name(display_name);
        if attempt == 0 {
            format!("{}_{}", millis, name)
        } else {
            format!("{}_{}_{}", millis, attempt, name)
        }
    }

    pub fn candidate_path(&self, millis: i64, display_name: &str, attempt: u32) -> PathBuf {
        self.trash_dir.join(Self::file_name(millis, display_name, attempt))
    }

    /// Whether `path` sits directly inside the trash directory
    pub fn is_in_trash(&self, path: &Path) -> bool {
        path.parent() == Some(self.trash_dir.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_uses_timestamp_prefix() {
        assert_eq!(TrashPathService::file_name(1700000000123, "a.jpg", 0), "1700000000123_a.jpg");
    }

    #[test]
    fn test_file_name_inserts_counter_on_collision() {
        assert_eq!(TrashPathService::file_name(5, "a.jpg", 2), "5_2_a.jpg");
    }

    #[test]
    fn test_sanitize_strips_path_separators() {
        assert_eq!(TrashPathService::sanitize_display_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(TrashPathService::sanitize_display_name("  "), "photo");
        assert_eq!(TrashPathService::sanitize_display_name(".."), "photo");
    }

    #[test]
    fn test_candidate_path_stays_in_trash() {
        let service = TrashPathService::new("/data/trash");
        let path = service.candidate_path(1, "dir/evil.png", 0);

        assert_eq!(path, PathBuf::from("/data/trash/1_dir_evil.png"));
        assert!(service.is_in_trash(&path));
        assert!(!service.is_in_trash(Path::new("/data/other/1_a.png")));
    }
}
