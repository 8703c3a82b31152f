use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::events;
use crate::error::AppError;
use crate::models::CalendarEvent;
use crate::services::require_id;

pub const MAX_UPCOMING_LIMIT: i64 = 500;

/// Time-windowed reads over calendar events. Upcoming/overdue is decided
/// against the query instant in UTC; nothing is persisted by a read.
#[derive(Clone)]
pub struct QueryService {
    db: SqlitePool,
}

impl QueryService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_upcoming_events(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        self.get_upcoming_events_at(user_id, limit, Utc::now()).await
    }

    /// Events starting at or after `now`, soonest first, ties by id.
    pub async fn get_upcoming_events_at(
        &self,
        user_id: &str,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        require_id("user_id", user_id)?;
        if !(1..=MAX_UPCOMING_LIMIT).contains(&limit) {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {}",
                MAX_UPCOMING_LIMIT
            )));
        }

        let events = events::fetch_upcoming(&self.db, user_id, now, limit).await?;
        Ok(events.into_iter().map(|e| e.at(now)).collect())
    }

    pub async fn get_overdue_events(&self, user_id: &str) -> Result<Vec<CalendarEvent>, AppError> {
        self.get_overdue_events_at(user_id, Utc::now()).await
    }

    /// Events already started and not completed, oldest first.
    pub async fn get_overdue_events_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        require_id("user_id", user_id)?;
        let events = events::fetch_overdue(&self.db, user_id, now).await?;
        Ok(events.into_iter().map(|e| e.at(now)).collect())
    }
}
