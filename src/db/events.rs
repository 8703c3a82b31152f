use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::models::{CalendarEvent, EventStatus, SourceType, UpsertOutcome};

const EVENT_COLUMNS: &str =
    "id, user_id, source_type, source_id, title, start_at, all_day, status, created_at, updated_at";

/// Inserts the event for `(user_id, source_type, source_id)` or updates the
/// existing one, in a single statement guarded by the unique index.
///
/// The `DO UPDATE ... WHERE` clause skips the write when title, start,
/// all-day flag and status are unchanged, so `updated_at` only moves on a real
/// change. SQLite returns no row in that case and the current row is read back.
///
/// `status: None` inserts as `upcoming` and leaves the stored status of an
/// existing row alone.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_event(
    db: &SqlitePool,
    user_id: &str,
    source_type: SourceType,
    source_id: &str,
    title: &str,
    start_at: DateTime<Utc>,
    all_day: bool,
    status: Option<EventStatus>,
) -> Result<(CalendarEvent, UpsertOutcome), sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let written = sqlx::query_as::<_, CalendarEvent>(&format!(
        r#"
        INSERT INTO calendar_events
            (id, user_id, source_type, source_id, title, start_at, all_day, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, COALESCE(?9, 'upcoming'), ?8, ?8)
        ON CONFLICT (user_id, source_type, source_id) DO UPDATE SET
            title = excluded.title,
            start_at = excluded.start_at,
            all_day = excluded.all_day,
            status = COALESCE(?9, calendar_events.status),
            updated_at = excluded.updated_at
        WHERE calendar_events.title IS NOT excluded.title
           OR calendar_events.start_at IS NOT excluded.start_at
           OR calendar_events.all_day IS NOT excluded.all_day
           OR (?9 IS NOT NULL AND calendar_events.status IS NOT ?9)
        RETURNING {EVENT_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(user_id)
    .bind(source_type)
    .bind(source_id)
    .bind(title)
    .bind(start_at)
    .bind(all_day)
    .bind(now)
    .bind(status)
    .fetch_optional(db)
    .await?;

    match written {
        Some(event) if event.id == id => Ok((event, UpsertOutcome::Inserted)),
        Some(event) => Ok((event, UpsertOutcome::Updated)),
        None => {
            let event = find_event_by_source(db, user_id, source_type, source_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            Ok((event, UpsertOutcome::Unchanged))
        }
    }
}

pub async fn find_event_by_source(
    db: &SqlitePool,
    user_id: &str,
    source_type: SourceType,
    source_id: &str,
) -> Result<Option<CalendarEvent>, sqlx::Error> {
    sqlx::query_as::<_, CalendarEvent>(&format!(
        "SELECT {EVENT_COLUMNS} FROM calendar_events WHERE user_id = ? AND source_type = ? AND source_id = ?"
    ))
    .bind(user_id)
    .bind(source_type)
    .bind(source_id)
    .fetch_optional(db)
    .await
}

pub async fn delete_event_by_source(
    db: &SqlitePool,
    user_id: &str,
    source_type: SourceType,
    source_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM calendar_events WHERE user_id = ? AND source_type = ? AND source_id = ?",
    )
    .bind(user_id)
    .bind(source_type)
    .bind(source_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn count_events_by_source_type(
    db: &SqlitePool,
    user_id: &str,
    source_type: SourceType,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM calendar_events WHERE user_id = ? AND source_type = ?")
        .bind(user_id)
        .bind(source_type)
        .fetch_one(db)
        .await
}

pub async fn fetch_upcoming(
    db: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<CalendarEvent>, sqlx::Error> {
    sqlx::query_as::<_, CalendarEvent>(&format!(
        r#"
        SELECT {EVENT_COLUMNS}
        FROM calendar_events
        WHERE user_id = ?1 AND start_at >= ?2
        ORDER BY start_at ASC, id ASC
        LIMIT ?3
        "#
    ))
    .bind(user_id)
    .bind(now)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn fetch_overdue(
    db: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>, sqlx::Error> {
    sqlx::query_as::<_, CalendarEvent>(&format!(
        r#"
        SELECT {EVENT_COLUMNS}
        FROM calendar_events
        WHERE user_id = ?1 AND start_at < ?2 AND status != 'completed'
        ORDER BY start_at ASC, id ASC
        "#
    ))
    .bind(user_id)
    .bind(now)
    .fetch_all(db)
    .await
}

/// Sets the stored status of the event derived from a source, if any.
/// Only `Upcoming` and `Completed` are meaningful here.
pub async fn set_status_by_source_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    source_type: SourceType,
    source_id: &str,
    status: EventStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE calendar_events
        SET status = ?1, updated_at = ?2
        WHERE user_id = ?3 AND source_type = ?4 AND source_id = ?5 AND status != ?1
        "#,
    )
    .bind(status)
    .bind(Utc::now())
    .bind(user_id)
    .bind(source_type)
    .bind(source_id)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(result > 0)
}
