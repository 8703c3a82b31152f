use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::models::{
    Assignment, Course, Folder, FolderMetadata, Milestone, NewAssignmentRequest, NewCourseRequest,
    NewMilestoneRequest,
};

const ASSIGNMENT_COLUMNS: &str =
    "id, user_id, course_id, title, due_at, progress_percent, created_at, updated_at";
const MILESTONE_COLUMNS: &str =
    "id, assignment_id, title, due_at, completed, weight, created_at, updated_at";

pub async fn fetch_courses(db: &SqlitePool, user_id: &str) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, user_id, title, is_archived, created_at, updated_at
        FROM courses
        WHERE user_id = ?1 AND is_archived = 0
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_course(
    db: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, user_id, title, is_archived, created_at, updated_at FROM courses WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_course(
    db: &SqlitePool,
    user_id: &str,
    req: NewCourseRequest,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO courses (id, user_id, title, is_archived, created_at, updated_at)
        VALUES (?1, ?2, ?3, 0, ?4, ?4)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&req.title)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Course {
        id,
        user_id: user_id.to_string(),
        title: req.title,
        is_archived: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_assignment_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_assignments_by_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn insert_assignment(
    db: &SqlitePool,
    user_id: &str,
    req: NewAssignmentRequest,
) -> Result<Assignment, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO assignments
            (id, user_id, course_id, title, due_at, progress_percent, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&req.course_id)
    .bind(&req.title)
    .bind(&req.due_at)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Assignment {
        id,
        user_id: user_id.to_string(),
        course_id: req.course_id,
        title: req.title,
        due_at: req.due_at,
        progress_percent: 0,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Deletes the assignment, its milestones and every calendar event derived
/// from either. Returns false when nothing owned by `user_id` matched.
pub async fn delete_assignment(
    db: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM calendar_events
        WHERE user_id = ?2
          AND source_type = 'milestone'
          AND source_id IN (SELECT id FROM milestones WHERE assignment_id = ?1)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "DELETE FROM calendar_events WHERE user_id = ? AND source_type = 'assignment_deadline' AND source_id = ?",
    )
    .bind(user_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "DELETE FROM milestones WHERE assignment_id IN (SELECT id FROM assignments WHERE id = ? AND user_id = ?)",
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM assignments WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted > 0)
}

pub async fn fetch_milestones_by_assignment(
    db: &SqlitePool,
    assignment_id: &str,
) -> Result<Vec<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(&format!(
        "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE assignment_id = ? ORDER BY id"
    ))
    .bind(assignment_id)
    .fetch_all(db)
    .await
}

pub async fn insert_milestone(
    db: &SqlitePool,
    assignment_id: &str,
    req: NewMilestoneRequest,
) -> Result<Milestone, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO milestones
            (id, assignment_id, title, due_at, completed, weight, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6)
        "#,
    )
    .bind(&id)
    .bind(assignment_id)
    .bind(&req.title)
    .bind(&req.due_at)
    .bind(req.weight)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Milestone {
        id,
        assignment_id: assignment_id.to_string(),
        title: req.title,
        due_at: req.due_at,
        completed: false,
        weight: req.weight,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Deletes a milestone owned (through its assignment) by `user_id`, along
/// with its calendar event.
pub async fn delete_milestone(
    db: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let deleted = sqlx::query(
        r#"
        DELETE FROM milestones
        WHERE id = ?1
          AND assignment_id IN (SELECT id FROM assignments WHERE user_id = ?2)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if deleted > 0 {
        sqlx::query(
            "DELETE FROM calendar_events WHERE user_id = ? AND source_type = 'milestone' AND source_id = ?",
        )
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(deleted > 0)
}

pub async fn find_milestone_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(&format!(
        "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn find_assignment_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn fetch_milestones_tx(
    tx: &mut Transaction<'_, Sqlite>,
    assignment_id: &str,
) -> Result<Vec<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(&format!(
        "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE assignment_id = ? ORDER BY id"
    ))
    .bind(assignment_id)
    .fetch_all(&mut **tx)
    .await
}

pub async fn set_milestone_completed_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    completed: bool,
    updated_at: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE milestones SET completed = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(completed)
        .bind(updated_at)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn set_assignment_progress_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    progress_percent: i64,
    updated_at: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE assignments SET progress_percent = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(progress_percent)
        .bind(updated_at)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn fetch_folders(db: &SqlitePool, user_id: &str) -> Result<Vec<Folder>, sqlx::Error> {
    sqlx::query_as::<_, Folder>(
        "SELECT id, user_id, parent_id, name, metadata, created_at FROM folders WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn insert_folder(
    db: &SqlitePool,
    user_id: &str,
    name: &str,
    parent_id: Option<&str>,
    metadata: Option<&FolderMetadata>,
) -> Result<Folder, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let metadata = metadata
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO folders (id, user_id, parent_id, name, metadata, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(parent_id)
    .bind(name)
    .bind(&metadata)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Folder {
        id,
        user_id: user_id.to_string(),
        parent_id: parent_id.map(str::to_string),
        name: name.to_string(),
        metadata,
        created_at: now,
    })
}
