use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Source-of-truth assignment. `due_at` is kept as stored text so a malformed
/// value fails reconciliation of this one assignment instead of the listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub title: String,
    pub due_at: Option<String>,
    pub progress_percent: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssignmentRequest {
    pub course_id: String,
    pub title: String,
    pub due_at: Option<String>,
}
