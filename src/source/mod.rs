mod http;

pub use http::HttpSource;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Assignment, Milestone};

/// Read access to the planning entities calendar events are derived from.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, AppError>;
    async fn list_assignments_by_user(&self, user_id: &str) -> Result<Vec<Assignment>, AppError>;
    async fn list_milestones_by_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<Milestone>, AppError>;

    /// Fetches an assignment owned by `user_id`. A foreign assignment is
    /// reported exactly like a missing one.
    async fn get_owned_assignment(&self, id: &str, user_id: &str) -> Result<Assignment, AppError> {
        match self.get_assignment(id).await? {
            Some(assignment) if assignment.user_id == user_id => Ok(assignment),
            _ => Err(AppError::NotFound),
        }
    }
}

#[derive(Clone)]
pub struct SqliteSource {
    db: SqlitePool,
}

impl SqliteSource {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SourceRepository for SqliteSource {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, AppError> {
        Ok(repository::find_assignment_by_id(&self.db, id).await?)
    }

    async fn list_assignments_by_user(&self, user_id: &str) -> Result<Vec<Assignment>, AppError> {
        Ok(repository::fetch_assignments_by_user(&self.db, user_id).await?)
    }

    async fn list_milestones_by_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<Milestone>, AppError> {
        Ok(repository::fetch_milestones_by_assignment(&self.db, assignment_id).await?)
    }
}
