use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SourceType {
    AssignmentDeadline,
    Milestone,
    Custom,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::AssignmentDeadline => "assignment_deadline",
            SourceType::Milestone => "milestone",
            SourceType::Custom => "custom",
        }
    }
}

/// Only `Upcoming` and `Completed` are ever stored; `Overdue` is derived from
/// the instant a query runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Overdue,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub all_day: bool,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Overdue strictly after the start instant; an event starting at `now`
    /// is still upcoming, matching the upcoming/overdue query split.
    pub fn effective_status(&self, now: DateTime<Utc>) -> EventStatus {
        match self.status {
            EventStatus::Completed => EventStatus::Completed,
            _ if self.start_at >= now => EventStatus::Upcoming,
            _ => EventStatus::Overdue,
        }
    }

    /// Returns the event with `status` replaced by its value at `now`.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }
}

/// What an upsert did to the row behind its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDate {
    pub start_at: DateTime<Utc>,
    pub all_day: bool,
}

/// Parses a stored due date. RFC 3339 timestamps are normalised to UTC;
/// a bare `YYYY-MM-DD` becomes an all-day event at 00:00 UTC.
pub fn parse_due_at(raw: &str) -> Result<DueDate, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(DueDate {
            start_at: dt.with_timezone(&Utc),
            all_day: false,
        });
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DueDate {
            start_at: naive.and_utc(),
            all_day: true,
        })
        .ok_or_else(|| AppError::validation(format!("malformed due date: {:?}", raw)))
}
