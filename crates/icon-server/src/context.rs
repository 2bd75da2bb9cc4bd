use std::sync::Arc;

use tracing::info;

use icon_core::IconStorageCoordinator;
use icon_meta::{InMemoryMetadataStore, MetadataStore, SqliteMetadataStore};
use icon_vcs::{BlobVersionStore, FsBlobStore, InMemoryBlobStore};

use crate::auth::{AuthProvider, TokenAuth};
use crate::config::{AppConfig, Backend};
use crate::error::ServerResult;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct ServiceContext {
    pub coordinator: IconStorageCoordinator,
    pub auth: Arc<dyn AuthProvider>,
}

impl ServiceContext {
    pub fn new(coordinator: IconStorageCoordinator, auth: Arc<dyn AuthProvider>) -> Self {
        Self { coordinator, auth }
    }

    /// Open the configured stores and wire them to a coordinator.
    pub async fn build(config: &AppConfig) -> ServerResult<Self> {
        let (meta, blobs): (Arc<dyn MetadataStore>, Arc<dyn BlobVersionStore>) =
            match config.backend {
                Backend::Sqlite => {
                    let meta = SqliteMetadataStore::open(config.metadata_path()).await?;
                    let blobs = FsBlobStore::open(config.blobs_path()).await?;
                    (Arc::new(meta), Arc::new(blobs))
                }
                Backend::Memory => (
                    Arc::new(InMemoryMetadataStore::new()),
                    Arc::new(InMemoryBlobStore::new()),
                ),
            };

        let coordinator =
            IconStorageCoordinator::new(meta, blobs, config.allowed_formats.clone());
        if config.reset_data {
            coordinator.reset().await?;
        }

        let auth = TokenAuth::new(&config.users);
        info!(
            backend = ?config.backend,
            data_dir = %config.data_dir.display(),
            users = auth.user_count(),
            "service context ready"
        );
        Ok(Self::new(coordinator, Arc::new(auth)))
    }
}
