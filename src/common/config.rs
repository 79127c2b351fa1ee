use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Rutas de almacenamiento
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root of the local media library indexed by the media adapter
    pub media_root: PathBuf,
    /// App-private directory holding trashed photo bytes
    pub trash_dir: PathBuf,
    /// SQLite file backing the trash ledger
    pub database_path: PathBuf,
}

impl StorageConfig {
    /// Builds every path under a single data directory
    pub fn under(data_dir: impl Into<PathBuf>, media_root: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            media_root: media_root.into(),
            trash_dir: data_dir.join("trash"),
            database_path: data_dir.join("fastphoto.db"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::under("./data", "./media")
    }
}

/// Configuración de la papelera
#[derive(Debug, Clone)]
pub struct TrashConfig {
    /// Días que un elemento permanece en la papelera antes de eliminarse
    pub retention_days: u32,
    /// Intervalo entre ejecuciones de limpieza automática (horas)
    pub cleanup_interval_hours: u64,
    /// Whether the background cleanup job runs at all
    pub cleanup_enabled: bool,
    /// Attempts at finding a free trash filename before giving up
    pub max_name_attempts: u32,
    /// Copy buffer size in bytes
    pub copy_buffer_bytes: usize,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            cleanup_interval_hours: 24,
            cleanup_enabled: true,
            max_name_attempts: 16,
            copy_buffer_bytes: 64 * 1024, // 64 KB
        }
    }
}

impl TrashConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours.max(1).saturating_mul(60 * 60))
    }
}

/// Configuración de la base de datos del ledger
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite only tolerates one writer; keep this at 1 unless reads dominate
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 1,
            busy_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

/// Configuración global de la aplicación
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub trash: TrashConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno, usando valores por defecto
    /// para las que falten o no se puedan interpretar.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(data_dir) = env::var("FASTPHOTO_DATA_DIR") {
            let media_root = config.storage.media_root.clone();
            config.storage = StorageConfig::under(data_dir, media_root);
        }
        if let Ok(media_root) = env::var("FASTPHOTO_MEDIA_ROOT") {
            config.storage.media_root = PathBuf::from(media_root);
        }
        if let Ok(trash_dir) = env::var("FASTPHOTO_TRASH_DIR") {
            config.storage.trash_dir = PathBuf::from(trash_dir);
        }
        if let Ok(db_path) = env::var("FASTPHOTO_DATABASE_PATH") {
            config.storage.database_path = PathBuf::from(db_path);
        }

        if let Some(days) = parse_env("FASTPHOTO_TRASH_RETENTION_DAYS") {
            config.trash.retention_days = days;
        }
        if let Some(hours) = parse_env("FASTPHOTO_TRASH_CLEANUP_INTERVAL_HOURS") {
            config.trash.cleanup_interval_hours = hours;
        }
        if let Some(enabled) = parse_env("FASTPHOTO_TRASH_CLEANUP_ENABLED") {
            config.trash.cleanup_enabled = enabled;
        }

        if let Some(max) = parse_env("FASTPHOTO_DB_MAX_CONNECTIONS") {
            config.database.max_connections = max;
        }
        if let Some(secs) = parse_env("FASTPHOTO_DB_BUSY_TIMEOUT_SECS") {
            config.database.busy_timeout_secs = secs;
        }

        config
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable value for {}: {:?}", key, raw);
            None
        }
    }
}
