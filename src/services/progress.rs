use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{events, repository};
use crate::error::AppError;
use crate::models::{Milestone, SourceType, ToggleResult};
use crate::services::reconciler::{deadline_status, milestone_status};
use crate::services::require_id;

#[derive(Clone)]
pub struct ProgressService {
    db: SqlitePool,
}

impl ProgressService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Flips a milestone's completion and rewrites the owning assignment's
    /// progress, all in one transaction. The derived calendar events follow:
    /// the milestone's event tracks its flag, the deadline event is completed
    /// exactly when progress reaches 100.
    pub async fn toggle(&self, milestone_id: &str, user_id: &str) -> Result<ToggleResult, AppError> {
        require_id("milestone_id", milestone_id)?;
        require_id("user_id", user_id)?;

        let mut tx = self.db.begin().await?;

        let mut milestone = repository::find_milestone_tx(&mut tx, milestone_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut assignment = match repository::find_assignment_tx(&mut tx, &milestone.assignment_id).await? {
            Some(a) if a.user_id == user_id => a,
            _ => return Err(AppError::NotFound),
        };

        let now = Utc::now().to_rfc3339();
        milestone.completed = !milestone.completed;
        milestone.updated_at = now.clone();
        repository::set_milestone_completed_tx(&mut tx, &milestone.id, milestone.completed, &now).await?;

        let siblings = repository::fetch_milestones_tx(&mut tx, &assignment.id).await?;
        let progress = compute_progress(&siblings);
        repository::set_assignment_progress_tx(&mut tx, &assignment.id, progress, &now).await?;
        assignment.progress_percent = progress;

        events::set_status_by_source_tx(
            &mut tx,
            user_id,
            SourceType::Milestone,
            &milestone.id,
            milestone_status(&milestone),
        )
        .await?;
        events::set_status_by_source_tx(
            &mut tx,
            user_id,
            SourceType::AssignmentDeadline,
            &assignment.id,
            deadline_status(&assignment),
        )
        .await?;

        tx.commit().await?;

        info!(
            "milestone {} completed={} -> assignment {} progress {}%",
            milestone.id, milestone.completed, assignment.id, progress
        );
        Ok(ToggleResult {
            milestone,
            assignment_progress: progress,
        })
    }
}

/// `round(100 * completed weight / total weight)`, clamped to 0..=100.
/// An assignment without milestones (or with no positive weight) is at 0.
pub fn compute_progress(milestones: &[Milestone]) -> i64 {
    let (done, total) = milestones
        .iter()
        .filter(|m| m.weight.is_finite() && m.weight > 0.0)
        .fold((0.0_f64, 0.0_f64), |(done, total), m| {
            let done = if m.completed { done + m.weight } else { done };
            (done, total + m.weight)
        });

    if total <= 0.0 {
        return 0;
    }
    ((100.0 * done / total).round() as i64).clamp(0, 100)
}
