use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{debug, error, info, instrument, warn};

use crate::application::dtos::trash_dto::{CleanupReport, MoveToTrashOutcome, RestoredPhoto, TrashedPhotoDto};
use crate::application::ports::outbound::{MediaIndexPort, MediaUpdate, MediaValues, DEFAULT_RELATIVE_PATH};
use crate::application::ports::storage_ports::{ByteReader, ByteWriter, TrashStoragePort};
use crate::application::ports::trash_ports::TrashUseCase;
use crate::application::transactions::trash_transaction::{MoveToTrashState, RestoreState, TrashTransaction};
use crate::common::config::TrashConfig;
use crate::common::errors::{DomainError, Result};
use crate::domain::entities::photo::Photo;
use crate::domain::entities::trashed_photo::TrashedPhoto;
use crate::domain::repositories::trash_repository::{TrashFeed, TrashRepository};

/// Servicio de aplicación para operaciones de papelera
pub struct TrashService {
    trash_repository: Arc<dyn TrashRepository>,
    trash_storage: Arc<dyn TrashStoragePort>,
    media_index: Arc<dyn MediaIndexPort>,
    config: TrashConfig,
}

impl TrashService {
    pub fn new(
        trash_repository: Arc<dyn TrashRepository>,
        trash_storage: Arc<dyn TrashStoragePort>,
        media_index: Arc<dyn MediaIndexPort>,
        config: TrashConfig,
    ) -> Self {
        Self {
            trash_repository,
            trash_storage,
            media_index,
            config,
        }
    }

    pub fn retention_days(&self) -> u32 {
        self.config.retention_days
    }

    /// Copia un flujo completo y cierra el destino
    async fn copy_stream(&self, reader: ByteReader, writer: &mut ByteWriter) -> std::io::Result<u64> {
        let mut reader = BufReader::with_capacity(self.config.copy_buffer_bytes.max(1024), reader);
        let copied = tokio::io::copy_buf(&mut reader, writer).await?;
        writer.flush().await?;
        writer.shutdown().await?;
        Ok(copied)
    }

    /// Elimina una copia parcial que no llegó a registrarse en el ledger
    async fn discard_trash_file(&self, path: &Path) {
        if let Err(e) = self.trash_storage.remove_file(path).await {
            error!("No se pudo eliminar la copia parcial {}: {}", path.display(), e);
        }
    }

    /// Borrado de archivo que no aborta la operación que lo contiene
    async fn remove_best_effort(&self, path: &Path, report: &mut CleanupReport) {
        match self.trash_storage.remove_file(path).await {
            Ok(true) => report.files_deleted += 1,
            Ok(false) => debug!("Archivo de papelera ya no existe: {}", path.display()),
            Err(e) => {
                warn!("Error al eliminar archivo de papelera {}: {}", path.display(), e);
                report.files_failed.push(path.to_path_buf());
            }
        }
    }
}

#[async_trait]
impl TrashUseCase for TrashService {
    #[instrument(skip(self))]
    async fn list_trash(&self) -> Result<Vec<TrashedPhotoDto>> {
        debug!("Obteniendo fotos en papelera");

        let now = Utc::now();
        let rows = self.trash_repository.list_all().await?;

        Ok(rows
            .iter()
            .map(|row| TrashedPhotoDto::from_entity(row, self.config.retention_days, now))
            .collect())
    }

    async fn watch_trash(&self) -> Result<TrashFeed> {
        Ok(self.trash_repository.find_all().await?)
    }

    async fn trash_count(&self) -> Result<u64> {
        Ok(self.trash_repository.count().await?)
    }

    #[instrument(skip(self, photo), fields(photo_id = photo.id))]
    async fn move_to_trash(&self, photo: &Photo) -> Result<MoveToTrashOutcome> {
        info!("Moviendo a papelera: id={}, nombre={}", photo.id, photo.display_name);

        let mut tx = TrashTransaction::begin("move_to_trash", format!("photo {}", photo.id), MoveToTrashState::Started);

        self.trash_storage.ensure_trash_dir().await.map_err(|e| tx.fail(e))?;

        // Open the source first so an unreadable photo leaves nothing behind
        let reader = self.media_index.open_read(&photo.uri).await.map_err(|e| tx.fail(e))?;

        let trashed_at = Utc::now();
        let (trash_path, mut writer) = self
            .trash_storage
            .create_trash_file(&photo.display_name, trashed_at)
            .await
            .map_err(|e| tx.fail(e))?;

        let copied = self.copy_stream(reader, &mut writer).await;
        drop(writer);
        match copied {
            Ok(bytes) => debug!("Copiados {} bytes a {}", bytes, trash_path.display()),
            Err(e) => {
                self.discard_trash_file(&trash_path).await;
                return Err(tx.fail(
                    DomainError::io_error("TrashFile", format!("Failed to copy {} into trash: {}", photo.uri, e))
                        .with_id(photo.id.to_string())
                        .with_source(e),
                ));
            }
        }
        tx.advance(MoveToTrashState::Copied)?;

        let mut trashed = TrashedPhoto::from_photo(photo, trash_path.clone(), trashed_at);
        match self.trash_repository.insert(&trashed).await {
            Ok(id) => trashed.id = id,
            Err(e) => {
                self.discard_trash_file(&trash_path).await;
                return Err(tx.fail(e.into()));
            }
        }
        tx.advance(MoveToTrashState::LedgerWritten)?;
        tx.advance(MoveToTrashState::IndexDeletePending)?;

        // La copia y el registro ya son durables; un fallo aquí solo deja la foto duplicada
        match self.media_index.delete(&photo.uri).await {
            Ok(()) => {
                tx.advance(MoveToTrashState::Completed)?;
                debug!("Foto {} movida a papelera como {}", photo.id, trash_path.display());
                Ok(MoveToTrashOutcome::Completed(trashed))
            }
            Err(e) => {
                warn!(
                    "Foto {} copiada a papelera pero el índice no la eliminó ({}); requiere reconciliación",
                    photo.id, e
                );
                Ok(MoveToTrashOutcome::ReconciliationNeeded {
                    trashed,
                    state: tx.state(),
                    reason: e.to_string(),
                })
            }
        }
    }

    #[instrument(skip(self, trashed), fields(trashed_id = trashed.id))]
    async fn restore_photo(&self, trashed: &TrashedPhoto) -> Result<RestoredPhoto> {
        info!("Restaurando foto {} desde {}", trashed.id, trashed.trash_file_path.display());

        let trash_path = trashed.trash_file();
        let mut tx = TrashTransaction::begin("restore_photo", format!("trashed photo {}", trashed.id), RestoreState::Verified);

        // Nothing is written to the index until the trash file is open
        let reader = match self.trash_storage.open_trash_file(trash_path).await {
            Ok(reader) => reader,
            Err(e) if e.is_not_found() => {
                // The row stays so the inconsistency remains visible and retryable
                warn!("Archivo de papelera no encontrado: {}", trash_path.display());
                return Err(e);
            }
            Err(e) => return Err(tx.fail(e)),
        };

        let values = MediaValues {
            display_name: trashed.display_name.clone(),
            mime_type: trashed.mime_type.clone(),
            width: trashed.width,
            height: trashed.height,
            relative_path: trashed
                .original_relative_path
                .clone()
                .unwrap_or_else(|| DEFAULT_RELATIVE_PATH.to_string()),
            pending: true,
        };
        let handle = self.media_index.insert(&values).await.map_err(|e| tx.fail(e))?;
        tx.advance(RestoreState::IndexEntryCreated)?;

        let mut writer = self.media_index.open_write(&handle).await.map_err(|e| tx.fail(e))?;
        let copied = self.copy_stream(reader, &mut writer).await;
        drop(writer);
        if let Err(e) = copied {
            return Err(tx.fail(
                DomainError::io_error("MediaIndex", format!("Failed to copy trash file into {}: {}", handle, e))
                    .with_source(e),
            ));
        }
        tx.advance(RestoreState::Copied)?;

        self.media_index
            .update(&handle, &MediaUpdate { pending: Some(false) })
            .await
            .map_err(|e| tx.fail(e))?;
        tx.advance(RestoreState::Finalized)?;

        let trash_file_removed = match self.trash_storage.remove_file(trash_path).await {
            Ok(_) => {
                tx.advance(RestoreState::TrashFileRemoved)?;
                true
            }
            Err(e) => {
                warn!("Foto restaurada pero el archivo {} no se pudo eliminar: {}", trash_path.display(), e);
                false
            }
        };

        self.trash_repository.delete(trashed).await.map_err(|e| tx.fail(e.into()))?;
        tx.advance(RestoreState::Completed)?;

        debug!("Foto {} restaurada como {}", trashed.id, handle);
        Ok(RestoredPhoto {
            handle,
            trashed_id: trashed.id,
            trash_file_removed,
        })
    }

    #[instrument(skip(self, trashed), fields(trashed_id = trashed.id))]
    async fn delete_permanently(&self, trashed: &TrashedPhoto) -> Result<()> {
        info!("Eliminando permanentemente foto {}", trashed.id);

        match self.trash_storage.remove_file(trashed.trash_file()).await {
            Ok(true) => debug!("Archivo eliminado: {}", trashed.trash_file_path.display()),
            Ok(false) => debug!("Archivo ya no existía: {}", trashed.trash_file_path.display()),
            Err(e) => warn!("Error al eliminar archivo {}: {}", trashed.trash_file_path.display(), e),
        }

        self.trash_repository.delete(trashed).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn empty_trash(&self) -> Result<CleanupReport> {
        info!("Vaciando papelera");

        let mut report = CleanupReport::default();
        for file in self.trash_storage.list_files().await? {
            self.remove_best_effort(&file.path, &mut report).await;
        }

        report.rows_deleted = self.trash_repository.count().await?;
        self.trash_repository.delete_all().await?;

        info!(
            "Papelera vaciada: {} registros, {} archivos, {} fallos",
            report.rows_deleted,
            report.files_deleted,
            report.files_failed.len()
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn auto_cleanup(&self, max_age_days: u32) -> Result<CleanupReport> {
        let cutoff = TrashedPhoto::expiry_cutoff(Utc::now(), max_age_days);
        debug!("Limpieza automática de papelera, límite {}", cutoff);

        let mut report = CleanupReport::default();

        let expired = self.trash_repository.find_older_than(cutoff).await?;
        for row in &expired {
            self.remove_best_effort(row.trash_file(), &mut report).await;
        }
        report.rows_deleted = self.trash_repository.delete_older_than(cutoff).await?;

        // Files still referenced by a row are never swept, whatever their age
        let referenced: HashSet<PathBuf> = self
            .trash_repository
            .list_all()
            .await?
            .into_iter()
            .map(|row| row.trash_file_path)
            .collect();

        for file in self.trash_storage.list_files().await? {
            if file.modified < cutoff && !referenced.contains(&file.path) {
                debug!("Eliminando archivo huérfano {}", file.path.display());
                self.remove_best_effort(&file.path, &mut report).await;
            }
        }

        if report.rows_deleted > 0 || report.files_deleted > 0 {
            info!(
                "Limpieza completada: {} registros y {} archivos eliminados",
                report.rows_deleted, report.files_deleted
            );
        }
        Ok(report)
    }
}
