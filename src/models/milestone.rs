use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub id: String,
    pub assignment_id: String,
    pub title: String,
    pub due_at: Option<String>,
    pub completed: bool,
    pub weight: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMilestoneRequest {
    pub title: String,
    pub due_at: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Result of flipping a milestone's completion flag.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleResult {
    pub milestone: Milestone,
    pub assignment_progress: i64,
}
