mod common;

use std::sync::Arc;

use async_trait::async_trait;
use planner::db::events;
use planner::error::AppError;
use planner::models::{Assignment, Milestone, SourceType};
use planner::services::{EventReconciler, SyncService};
use planner::source::{SourceRepository, SqliteSource};
use sqlx::SqlitePool;

use common::*;

/// Three assignments (two dated) and five milestones (three dated).
async fn seed_semester(pool: &SqlitePool, user_id: &str) {
    let course = seed_course(pool, user_id).await;
    let a1 = seed_assignment(pool, user_id, &course.id, "Essay", Some("2026-11-10T12:00:00Z")).await;
    let a2 = seed_assignment(pool, user_id, &course.id, "Project", Some("2026-12-01")).await;
    let a3 = seed_assignment(pool, user_id, &course.id, "Reading log", None).await;

    seed_milestone(pool, &a1.id, "Outline", Some("2026-11-01T12:00:00Z"), 1.0).await;
    seed_milestone(pool, &a1.id, "Sources", None, 1.0).await;
    seed_milestone(pool, &a2.id, "Prototype", Some("2026-11-15"), 2.0).await;
    seed_milestone(pool, &a3.id, "Week 1", Some("2026-10-30T08:00:00+02:00"), 1.0).await;
    seed_milestone(pool, &a3.id, "Week 2", None, 1.0).await;
}

#[tokio::test]
async fn test_sync_counts_existing_events_and_is_idempotent() {
    let pool = test_pool().await;
    seed_semester(&pool, "alice").await;
    let sync = SyncService::new(reconciler(&pool), 4);

    let first = sync.sync_user_events("alice").await.expect("sync failed");
    assert_eq!(first.assignment_events, 2);
    assert_eq!(first.milestone_events, 3);
    assert_eq!(first.inserted, 5);
    assert!(first.failures.is_empty());

    let second = sync.sync_user_events("alice").await.expect("resync failed");
    assert_eq!(second.assignment_events, 2);
    assert_eq!(second.milestone_events, 3);
    assert_eq!(second.inserted, 0, "a repeat pass must not insert rows");
    assert_eq!(event_count(&pool).await, 5);

    let deadlines = events::count_events_by_source_type(&pool, "alice", SourceType::AssignmentDeadline)
        .await
        .unwrap();
    assert_eq!(deadlines, 2);
}

#[tokio::test]
async fn test_sync_only_touches_the_callers_entities() {
    let pool = test_pool().await;
    seed_semester(&pool, "alice").await;
    seed_semester(&pool, "bob").await;
    let sync = SyncService::new(reconciler(&pool), 2);

    let report = sync.sync_user_events("alice").await.unwrap();
    assert_eq!(report.assignment_events + report.milestone_events, 5);
    assert_eq!(event_count(&pool).await, 5);

    let bob_events = events::count_events_by_source_type(&pool, "bob", SourceType::Milestone)
        .await
        .unwrap();
    assert_eq!(bob_events, 0);
}

#[tokio::test]
async fn test_malformed_entity_does_not_abort_the_pass() {
    let pool = test_pool().await;
    let course = seed_course(&pool, "alice").await;
    let good = seed_assignment(&pool, "alice", &course.id, "Good", Some("2026-11-10")).await;
    let bad = seed_assignment(&pool, "alice", &course.id, "Bad", Some("the 31st of never")).await;
    seed_milestone(&pool, &bad.id, "Still fine", Some("2026-11-05"), 1.0).await;
    let broken = seed_milestone(&pool, &good.id, "Broken", Some("2026-13-45"), 1.0).await;

    let sync = SyncService::new(reconciler(&pool), 1);
    let report = sync.sync_user_events("alice").await.expect("partial sync must succeed");

    assert_eq!(report.assignment_events, 1);
    assert_eq!(report.milestone_events, 1);
    assert_eq!(report.failures.len(), 2);

    let failed: Vec<(&str, SourceType)> = report
        .failures
        .iter()
        .map(|f| (f.source_id.as_str(), f.source_type))
        .collect();
    assert!(failed.contains(&(bad.id.as_str(), SourceType::AssignmentDeadline)));
    assert!(failed.contains(&(broken.id.as_str(), SourceType::Milestone)));
}

#[tokio::test]
async fn test_lost_connection_aborts_the_pass() {
    let pool = test_pool().await;
    seed_semester(&pool, "alice").await;
    let sync = SyncService::new(reconciler(&pool), 4);

    pool.close().await;

    let err = sync.sync_user_events("alice").await.expect_err("closed pool must fail");
    assert!(err.is_connection_failure(), "unexpected error: {:?}", err);
}

/// Wraps the SQLite source and fails milestone listing for one assignment.
struct FlakySource {
    inner: SqliteSource,
    failing_assignment: String,
    error: fn() -> sqlx::Error,
}

#[async_trait]
impl SourceRepository for FlakySource {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, AppError> {
        self.inner.get_assignment(id).await
    }

    async fn list_assignments_by_user(&self, user_id: &str) -> Result<Vec<Assignment>, AppError> {
        self.inner.list_assignments_by_user(user_id).await
    }

    async fn list_milestones_by_assignment(&self, assignment_id: &str) -> Result<Vec<Milestone>, AppError> {
        if assignment_id == self.failing_assignment {
            return Err(AppError::Database((self.error)()));
        }
        self.inner.list_milestones_by_assignment(assignment_id).await
    }
}

#[tokio::test]
async fn test_per_entity_storage_error_is_recorded() {
    let pool = test_pool().await;
    let course = seed_course(&pool, "alice").await;
    let a1 = seed_assignment(&pool, "alice", &course.id, "One", Some("2026-11-10")).await;
    let a2 = seed_assignment(&pool, "alice", &course.id, "Two", Some("2026-11-12")).await;
    seed_milestone(&pool, &a1.id, "Lost", Some("2026-11-01"), 1.0).await;
    seed_milestone(&pool, &a2.id, "Kept", Some("2026-11-02"), 1.0).await;

    let source = Arc::new(FlakySource {
        inner: SqliteSource::new(pool.clone()),
        failing_assignment: a1.id.clone(),
        error: || sqlx::Error::RowNotFound,
    });
    let sync = SyncService::new(Arc::new(EventReconciler::new(pool.clone(), source)), 2);

    let report = sync.sync_user_events("alice").await.expect("pass must continue");
    assert_eq!(report.assignment_events, 2);
    assert_eq!(report.milestone_events, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source_id, a1.id);
}

#[tokio::test]
async fn test_connection_error_mid_pass_is_fatal() {
    let pool = test_pool().await;
    let course = seed_course(&pool, "alice").await;
    let a1 = seed_assignment(&pool, "alice", &course.id, "One", Some("2026-11-10")).await;
    seed_assignment(&pool, "alice", &course.id, "Two", Some("2026-11-12")).await;

    let source = Arc::new(FlakySource {
        inner: SqliteSource::new(pool.clone()),
        failing_assignment: a1.id.clone(),
        error: || sqlx::Error::PoolTimedOut,
    });
    let sync = SyncService::new(Arc::new(EventReconciler::new(pool.clone(), source)), 1);

    let err = sync.sync_user_events("alice").await.expect_err("connection loss is fatal");
    assert!(matches!(err, AppError::Database(sqlx::Error::PoolTimedOut)));
}
