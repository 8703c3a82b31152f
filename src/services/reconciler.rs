use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::events;
use crate::error::AppError;
use crate::models::{
    Assignment, CalendarEvent, EventStatus, Milestone, SourceType, UpsertOutcome, parse_due_at,
};
use crate::services::require_id;
use crate::source::SourceRepository;

/// Maps one source fact (an assignment deadline or a milestone due date) to
/// exactly one calendar event.
pub struct EventReconciler {
    db: SqlitePool,
    source: Arc<dyn SourceRepository>,
}

impl EventReconciler {
    pub fn new(db: SqlitePool, source: Arc<dyn SourceRepository>) -> Self {
        Self { db, source }
    }

    pub fn source(&self) -> &Arc<dyn SourceRepository> {
        &self.source
    }

    /// Writes the event behind `(user_id, source_type, source_id)`. A new
    /// event starts out `upcoming`; an existing one keeps its stored status.
    pub async fn upsert_event(
        &self,
        user_id: &str,
        source_type: SourceType,
        source_id: &str,
        title: &str,
        start_at: DateTime<Utc>,
        all_day: bool,
    ) -> Result<(CalendarEvent, UpsertOutcome), AppError> {
        self.write_event(user_id, source_type, source_id, title, start_at, all_day, None)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_event(
        &self,
        user_id: &str,
        source_type: SourceType,
        source_id: &str,
        title: &str,
        start_at: DateTime<Utc>,
        all_day: bool,
        status: Option<EventStatus>,
    ) -> Result<(CalendarEvent, UpsertOutcome), AppError> {
        require_id("user_id", user_id)?;
        require_id("source_id", source_id)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("event title must not be empty"));
        }

        let write = || {
            events::upsert_event(
                &self.db,
                user_id,
                source_type,
                source_id,
                title,
                start_at,
                all_day,
                status,
            )
        };

        let (event, outcome) = match write().await.map_err(AppError::from_write) {
            // The key itself cannot conflict; this is a row-id collision,
            // which a second attempt with a fresh id settles.
            Err(AppError::Conflict(msg)) => {
                debug!("upsert conflict on {}:{} ({}), retrying", source_type.as_str(), source_id, msg);
                write().await.map_err(AppError::from_write)?
            }
            other => other?,
        };

        debug!(
            "reconciled {} event for {} -> {} ({:?})",
            source_type.as_str(),
            source_id,
            event.id,
            outcome
        );
        Ok((event, outcome))
    }

    pub async fn generate_assignment_deadline_event(
        &self,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Option<CalendarEvent>, AppError> {
        require_id("assignment_id", assignment_id)?;
        require_id("user_id", user_id)?;

        let assignment = self.source.get_owned_assignment(assignment_id, user_id).await?;
        Ok(self.reconcile_deadline(&assignment).await?.map(|(event, _)| event))
    }

    /// Events are returned in ascending milestone id order.
    pub async fn generate_milestone_events(
        &self,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        require_id("assignment_id", assignment_id)?;
        require_id("user_id", user_id)?;

        let assignment = self.source.get_owned_assignment(assignment_id, user_id).await?;
        let mut milestones = self.source.list_milestones_by_assignment(&assignment.id).await?;
        milestones.sort_by(|a, b| a.id.cmp(&b.id));

        let mut generated = Vec::with_capacity(milestones.len());
        for milestone in &milestones {
            if let Some((event, _)) = self.reconcile_milestone(&assignment, milestone).await? {
                generated.push(event);
            }
        }
        Ok(generated)
    }

    /// Brings the deadline event of an already-resolved assignment up to date.
    /// `None` means the assignment has no due date; a leftover event from an
    /// earlier due date is removed.
    pub(crate) async fn reconcile_deadline(
        &self,
        assignment: &Assignment,
    ) -> Result<Option<(CalendarEvent, UpsertOutcome)>, AppError> {
        let Some(raw) = assignment.due_at.as_deref() else {
            self.remove_stale(&assignment.user_id, SourceType::AssignmentDeadline, &assignment.id)
                .await?;
            return Ok(None);
        };

        let due = parse_due_at(raw)?;
        let reconciled = self
            .write_event(
                &assignment.user_id,
                SourceType::AssignmentDeadline,
                &assignment.id,
                &assignment.title,
                due.start_at,
                due.all_day,
                Some(deadline_status(assignment)),
            )
            .await?;
        Ok(Some(reconciled))
    }

    pub(crate) async fn reconcile_milestone(
        &self,
        assignment: &Assignment,
        milestone: &Milestone,
    ) -> Result<Option<(CalendarEvent, UpsertOutcome)>, AppError> {
        let Some(raw) = milestone.due_at.as_deref() else {
            self.remove_stale(&assignment.user_id, SourceType::Milestone, &milestone.id)
                .await?;
            return Ok(None);
        };

        let due = parse_due_at(raw)?;
        let title = format!("{}: {}", assignment.title, milestone.title);
        let reconciled = self
            .write_event(
                &assignment.user_id,
                SourceType::Milestone,
                &milestone.id,
                &title,
                due.start_at,
                due.all_day,
                Some(milestone_status(milestone)),
            )
            .await?;
        Ok(Some(reconciled))
    }

    async fn remove_stale(
        &self,
        user_id: &str,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<(), AppError> {
        if events::delete_event_by_source(&self.db, user_id, source_type, source_id).await? {
            info!(
                "removed {} event for {} after its due date was cleared",
                source_type.as_str(),
                source_id
            );
        }
        Ok(())
    }
}

/// The stored status a deadline event should carry: completed once the
/// assignment is fully done.
pub fn deadline_status(assignment: &Assignment) -> EventStatus {
    if assignment.progress_percent >= 100 {
        EventStatus::Completed
    } else {
        EventStatus::Upcoming
    }
}

pub fn milestone_status(milestone: &Milestone) -> EventStatus {
    if milestone.completed {
        EventStatus::Completed
    } else {
        EventStatus::Upcoming
    }
}
