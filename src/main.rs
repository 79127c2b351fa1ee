use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fastphoto::application::dtos::gallery_dto::GalleryQuery;
use fastphoto::application::ports::inbound::GalleryUseCase;
use fastphoto::common::db::create_ledger_pool;
use fastphoto::{
    AppConfig, GalleryService, MediaCatalogService, MediaFsRepository, TrashCleanupService, TrashFsStorage,
    TrashService, TrashSqliteRepository,
};

/// FastPhoto maintenance daemon
///
/// Opens the trash ledger and the local media index, logs what the gallery
/// currently holds and keeps the trash cleanup job running until Ctrl-C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = AppConfig::from_env();
    tracing::info!(
        "Media root: {}, trash: {}, ledger: {}",
        config.storage.media_root.display(),
        config.storage.trash_dir.display(),
        config.storage.database_path.display()
    );

    let pool = create_ledger_pool(&config).await?;
    let trash_repository = Arc::new(
        TrashSqliteRepository::new(Arc::new(pool))
            .await
            .context("Failed to load trash ledger")?,
    );

    let media_index = Arc::new(MediaFsRepository::open(config.storage.media_root.clone()).await?);
    let scan = media_index.scan().await?;
    tracing::info!("Media index ready ({} new, {} removed)", scan.added, scan.removed);

    let trash_storage = Arc::new(TrashFsStorage::new(config.storage.trash_dir.clone(), &config.trash));

    let trash_service = Arc::new(TrashService::new(
        trash_repository,
        trash_storage,
        media_index.clone(),
        config.trash.clone(),
    ));
    let catalog_service = Arc::new(MediaCatalogService::new(media_index));
    let gallery_service = GalleryService::new(catalog_service, trash_service.clone());

    let snapshot = gallery_service.load_gallery(&GalleryQuery::all_photos()).await?;
    tracing::info!(
        "Gallery: {} photos in {} albums, {} in trash",
        snapshot.photos.len(),
        snapshot.all_albums.len(),
        snapshot.trash_count
    );
    for album in &snapshot.all_albums {
        tracing::debug!("Album {} ({}): {} photos", album.name, album.bucket_id, album.photo_count);
    }

    let cleanup_job = if config.trash.cleanup_enabled {
        let cleanup_service = TrashCleanupService::new(trash_service.clone(), &config.trash);
        Some(cleanup_service.start_cleanup_job())
    } else {
        tracing::info!("Trash cleanup disabled");
        None
    };

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");

    if let Some(job) = cleanup_job {
        job.abort();
    }
    Ok(())
}
