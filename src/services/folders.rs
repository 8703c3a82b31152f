use sqlx::SqlitePool;
use tracing::warn;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Folder, FolderMetadata, FolderNode, NewFolderRequest, build_folder_tree, decode_json_field};
use crate::services::require_id;

#[derive(Clone)]
pub struct FolderService {
    db: SqlitePool,
}

impl FolderService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create_folder(&self, user_id: &str, req: NewFolderRequest) -> Result<Folder, AppError> {
        require_id("user_id", user_id)?;
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("folder name must not be empty"));
        }

        if let Some(parent_id) = req.parent_id.as_deref() {
            require_id("parent_id", parent_id)?;
            let folders = repository::fetch_folders(&self.db, user_id).await?;
            if !folders.iter().any(|f| f.id == parent_id) {
                return Err(AppError::NotFound);
            }
        }

        Ok(repository::insert_folder(
            &self.db,
            user_id,
            name,
            req.parent_id.as_deref(),
            req.metadata.as_ref(),
        )
        .await?)
    }

    pub async fn folder_tree(&self, user_id: &str) -> Result<Vec<FolderNode>, AppError> {
        require_id("user_id", user_id)?;
        let folders = repository::fetch_folders(&self.db, user_id).await?;

        Ok(build_folder_tree(folders, |folder| {
            match decode_json_field::<FolderMetadata>("folders.metadata", folder.metadata.as_deref()) {
                Ok(metadata) => metadata.unwrap_or_default(),
                Err(e) => {
                    warn!("folder {}: {}", folder.id, e);
                    FolderMetadata::default()
                }
            }
        }))
    }
}
