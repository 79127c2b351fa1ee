use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

use crate::application::dtos::trash_dto::CleanupReport;
use crate::application::ports::trash_ports::TrashUseCase;
use crate::common::config::TrashConfig;
use crate::common::errors::Result;

/// Servicio para la limpieza automática de fotos expiradas en la papelera
pub struct TrashCleanupService {
    trash_service: Arc<dyn TrashUseCase>,
    retention_days: u32,
    cleanup_interval: Duration,
}

impl TrashCleanupService {
    pub fn new(trash_service: Arc<dyn TrashUseCase>, config: &TrashConfig) -> Self {
        Self {
            trash_service,
            retention_days: config.retention_days,
            cleanup_interval: config.cleanup_interval(), // Mínimo 1 hora
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    /// Inicia el trabajo de limpieza periódica. La primera pasada es inmediata.
    #[instrument(skip(self))]
    pub fn start_cleanup_job(&self) -> JoinHandle<()> {
        let trash_service = self.trash_service.clone();
        let retention_days = self.retention_days;
        let interval_duration = self.cleanup_interval;

        info!(
            "Iniciando trabajo de limpieza de papelera cada {:?}, retención {} días",
            interval_duration, retention_days
        );

        tokio::spawn(async move {
            let mut interval = time::interval(interval_duration);

            loop {
                // El primer tick se completa al instante
                interval.tick().await;
                debug!("Ejecutando tarea programada de limpieza de papelera");

                if let Err(e) = Self::cleanup_expired_items(trash_service.as_ref(), retention_days).await {
                    error!("Error en la limpieza programada de la papelera: {}", e);
                }
            }
        })
    }

    /// Una sola pasada de limpieza
    pub async fn run_once(&self) -> Result<CleanupReport> {
        Self::cleanup_expired_items(self.trash_service.as_ref(), self.retention_days).await
    }

    #[instrument(skip(trash_service))]
    async fn cleanup_expired_items(trash_service: &dyn TrashUseCase, retention_days: u32) -> Result<CleanupReport> {
        debug!("Comenzando limpieza de elementos expirados en la papelera");

        let report = trash_service.auto_cleanup(retention_days).await?;

        if report.is_clean() {
            debug!(
                "Limpieza terminada: {} registros, {} archivos",
                report.rows_deleted, report.files_deleted
            );
        } else {
            warn!(
                "Limpieza terminada con {} archivos sin eliminar",
                report.files_failed.len()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::application::dtos::trash_dto::{MoveToTrashOutcome, RestoredPhoto, TrashedPhotoDto};
    use crate::common::errors::DomainError;
    use crate::domain::entities::photo::Photo;
    use crate::domain::entities::trashed_photo::TrashedPhoto;
    use crate::domain::repositories::trash_repository::TrashFeed;

    /// Counts cleanup calls; everything else is unreachable from the job
    #[derive(Default)]
    struct CountingTrash {
        cleanups: AtomicU32,
        last_age: AtomicU32,
    }

    #[async_trait]
    impl TrashUseCase for CountingTrash {
        async fn list_trash(&self) -> Result<Vec<TrashedPhotoDto>> {
            Ok(Vec::new())
        }
        async fn watch_trash(&self) -> Result<TrashFeed> {
            Err(DomainError::internal_error("Test", "unused"))
        }
        async fn trash_count(&self) -> Result<u64> {
            Ok(0)
        }
        async fn move_to_trash(&self, _photo: &Photo) -> Result<MoveToTrashOutcome> {
            Err(DomainError::internal_error("Test", "unused"))
        }
        async fn restore_photo(&self, _trashed: &TrashedPhoto) -> Result<RestoredPhoto> {
            Err(DomainError::internal_error("Test", "unused"))
        }
        async fn delete_permanently(&self, _trashed: &TrashedPhoto) -> Result<()> {
            Ok(())
        }
        async fn empty_trash(&self) -> Result<CleanupReport> {
            Ok(CleanupReport::default())
        }
        async fn auto_cleanup(&self, max_age_days: u32) -> Result<CleanupReport> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            self.last_age.store(max_age_days, Ordering::SeqCst);
            Ok(CleanupReport {
                rows_deleted: 1,
                ..CleanupReport::default()
            })
        }
    }

    #[test]
    fn test_interval_has_one_hour_floor() {
        let config = TrashConfig {
            cleanup_interval_hours: 0,
            ..TrashConfig::default()
        };
        let service = TrashCleanupService::new(Arc::new(CountingTrash::default()), &config);
        assert_eq!(service.cleanup_interval(), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_run_once_uses_retention() {
        let trash = Arc::new(CountingTrash::default());
        let config = TrashConfig {
            retention_days: 7,
            ..TrashConfig::default()
        };
        let service = TrashCleanupService::new(trash.clone(), &config);

        let report = service.run_once().await.unwrap();

        assert_eq!(report.rows_deleted, 1);
        assert_eq!(trash.last_age.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_job_runs_immediately() {
        let trash = Arc::new(CountingTrash::default());
        let service = TrashCleanupService::new(trash.clone(), &TrashConfig::default());

        let handle = service.start_cleanup_job();
        for _ in 0..50 {
            if trash.cleanups.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(trash.cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(trash.last_age.load(Ordering::SeqCst), 30);
    }
}
