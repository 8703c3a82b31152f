#![allow(dead_code)]

use std::sync::Arc;

use planner::db::{self, repository};
use planner::models::{Assignment, Course, Milestone, NewAssignmentRequest, NewCourseRequest, NewMilestoneRequest};
use planner::services::EventReconciler;
use planner::source::SqliteSource;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

/// In-memory database with the real migrations applied. A single connection
/// keeps every query on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    db::migrate(&pool).await.expect("Failed to run migrations");
    pool
}

/// File-backed database in a temporary directory, for tests that need several
/// connections writing at once. Keep the `TempDir` alive as long as the pool.
pub async fn file_pool(max_connections: u32) -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("planner.db").display());

    let pool = db::connect(&url, max_connections)
        .await
        .expect("Failed to create database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    (dir, pool)
}

pub fn reconciler(pool: &SqlitePool) -> Arc<EventReconciler> {
    Arc::new(EventReconciler::new(
        pool.clone(),
        Arc::new(SqliteSource::new(pool.clone())),
    ))
}

pub async fn seed_course(pool: &SqlitePool, user_id: &str) -> Course {
    repository::insert_course(
        pool,
        user_id,
        NewCourseRequest {
            title: "Operating Systems".to_string(),
        },
    )
    .await
    .expect("Failed to insert course")
}

pub async fn seed_assignment(
    pool: &SqlitePool,
    user_id: &str,
    course_id: &str,
    title: &str,
    due_at: Option<&str>,
) -> Assignment {
    repository::insert_assignment(
        pool,
        user_id,
        NewAssignmentRequest {
            course_id: course_id.to_string(),
            title: title.to_string(),
            due_at: due_at.map(str::to_string),
        },
    )
    .await
    .expect("Failed to insert assignment")
}

pub async fn seed_milestone(
    pool: &SqlitePool,
    assignment_id: &str,
    title: &str,
    due_at: Option<&str>,
    weight: f64,
) -> Milestone {
    repository::insert_milestone(
        pool,
        assignment_id,
        NewMilestoneRequest {
            title: title.to_string(),
            due_at: due_at.map(str::to_string),
            weight,
        },
    )
    .await
    .expect("Failed to insert milestone")
}

pub async fn event_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM calendar_events")
        .fetch_one(pool)
        .await
        .expect("Failed to count events")
}
