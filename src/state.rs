use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::clients::ClientCache;
use crate::config::AppConfig;
use crate::services::{EventReconciler, FolderService, ProgressService, QueryService, SyncService};
use crate::source::{HttpSource, SourceRepository, SqliteSource};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
    pub reconciler: Arc<EventReconciler>,
    pub sync: Arc<SyncService>,
    pub queries: QueryService,
    pub progress: ProgressService,
    pub folders: FolderService,
    pub clients: ClientCache,
}

impl AppState {
    /// Reads source entities from `config.source_api` when it is set,
    /// otherwise from the local database.
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let clients = ClientCache::new();
        let source: Arc<dyn SourceRepository> = match &config.source_api {
            Some(api) => {
                info!("reading source entities from {}", api.url);
                Arc::new(HttpSource::new(api.url.clone(), api.token.clone(), clients.clone()))
            }
            None => Arc::new(SqliteSource::new(db.clone())),
        };
        Self::build(db, config, source, clients)
    }

    /// Builds the state around an explicit source repository.
    pub fn with_source(db: SqlitePool, config: AppConfig, source: Arc<dyn SourceRepository>) -> Self {
        Self::build(db, config, source, ClientCache::new())
    }

    fn build(
        db: SqlitePool,
        config: AppConfig,
        source: Arc<dyn SourceRepository>,
        clients: ClientCache,
    ) -> Self {
        let reconciler = Arc::new(EventReconciler::new(db.clone(), source));
        let sync = Arc::new(SyncService::new(reconciler.clone(), config.sync_concurrency));

        Self {
            queries: QueryService::new(db.clone()),
            progress: ProgressService::new(db.clone()),
            folders: FolderService::new(db.clone()),
            clients,
            reconciler,
            sync,
            config,
            db,
        }
    }
}
