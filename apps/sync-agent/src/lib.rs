pub mod config;
pub mod db;
pub mod error;
pub mod global;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use library_core::Family;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{StorageConfig, SyncConfig};
use crate::db::SqliteRepository;
use crate::global::HttpGlobalClient;
use crate::storage::{BlobStore, LocalBlobStore, S3BlobStore};

pub use crate::error::{Result, SyncError};
pub use crate::sync::SyncEngine;

/// Run the families named in `args` (all of them when empty) once.
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let families = args
        .iter()
        .map(|arg| arg.parse::<Family>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let config = SyncConfig::from_env()?;

    tracing::info!("Opening replica database at {}", config.database_path.display());
    let repo = SqliteRepository::open(&config.database_path)?;

    let blobs: Arc<dyn BlobStore> = match &config.storage {
        StorageConfig::Local { root } => {
            tracing::info!("Using local blob storage at {}", root.display());
            Arc::new(LocalBlobStore::new(root.clone()))
        }
        StorageConfig::S3 => {
            tracing::info!("Initializing S3 storage...");
            Arc::new(S3BlobStore::from_env()?)
        }
    };

    let source = Arc::new(HttpGlobalClient::new(
        &config.global_api_url,
        config.global_api_token.clone(),
    ));
    let engine = SyncEngine::new(repo, source, blobs, config.role);

    let results = if families.is_empty() {
        engine.sync_all().await
    } else {
        let mut results = Vec::with_capacity(families.len());
        for family in families {
            results.push((family, engine.sync_family(family).await));
        }
        results
    };

    let (succeeded, failures) = sync::summarize(&results);
    tracing::info!("Sync finished: {} families succeeded, {} failed", succeeded, failures.len());
    for (family, message) in &failures {
        tracing::error!("{}: {}", family, message);
    }

    if !failures.is_empty() {
        anyhow::bail!("{} of {} families failed", failures.len(), results.len());
    }
    Ok(())
}
