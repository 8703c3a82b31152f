pub mod extract;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::SyncReport;
use crate::state::AppState;

pub use extract::{CurrentUser, USER_HEADER};

#[derive(Deserialize)]
struct UpcomingQueryParams {
    limit: Option<i64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/assignments", post(create_assignment))
        .route("/assignments/{id}", delete(delete_assignment))
        .route("/assignments/{id}/milestones", post(create_milestone))
        .route("/assignments/{id}/calendar/deadline", post(generate_deadline_event))
        .route("/assignments/{id}/calendar/milestones", post(generate_milestone_events))
        .route("/milestones/{id}", delete(delete_milestone))
        .route("/milestones/{id}/toggle", patch(toggle_milestone))
        .route("/calendar/sync", post(sync_now))
        .route("/calendar/upcoming", get(upcoming_events))
        .route("/calendar/overdue", get(overdue_events))
        .route("/folders", post(create_folder))
        .route("/folders/tree", get(folder_tree))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db, &user_id).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("course title must not be empty"));
    }
    let course = repository::insert_course(&state.db, &user_id, req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn create_assignment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<NewAssignmentRequest>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("assignment title must not be empty"));
    }
    if let Some(due_at) = req.due_at.as_deref() {
        parse_due_at(due_at)?;
    }
    repository::find_course(&state.db, &req.course_id, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let assignment = repository::insert_assignment(&state.db, &user_id, req).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn delete_assignment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_assignment(&state.db, &id, &user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn create_milestone(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(assignment_id): Path<String>,
    Json(req): Json<NewMilestoneRequest>,
) -> Result<(StatusCode, Json<Milestone>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("milestone title must not be empty"));
    }
    if !(req.weight.is_finite() && req.weight > 0.0) {
        return Err(AppError::validation("milestone weight must be a positive number"));
    }
    if let Some(due_at) = req.due_at.as_deref() {
        parse_due_at(due_at)?;
    }
    let assignment = state
        .reconciler
        .source()
        .get_owned_assignment(&assignment_id, &user_id)
        .await?;

    let milestone = repository::insert_milestone(&state.db, &assignment.id, req).await?;
    Ok((StatusCode::CREATED, Json(milestone)))
}

async fn delete_milestone(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_milestone(&state.db, &id, &user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn generate_deadline_event(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<Option<CalendarEvent>>, AppError> {
    let event = state
        .reconciler
        .generate_assignment_deadline_event(&assignment_id, &user_id)
        .await?;
    Ok(Json(event))
}

async fn generate_milestone_events(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let events = state
        .reconciler
        .generate_milestone_events(&assignment_id, &user_id)
        .await?;
    Ok(Json(events))
}

async fn toggle_milestone(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ToggleResult>, AppError> {
    let result = state.progress.toggle(&id, &user_id).await?;
    Ok(Json(result))
}

async fn sync_now(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SyncReport>, AppError> {
    let report = state.sync.sync_user_events(&user_id).await?;
    Ok(Json(report))
}

async fn upcoming_events(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<UpcomingQueryParams>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let limit = params.limit.unwrap_or(state.config.upcoming_default_limit);
    let events = state.queries.get_upcoming_events(&user_id, limit).await?;
    Ok(Json(events))
}

async fn overdue_events(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let events = state.queries.get_overdue_events(&user_id).await?;
    Ok(Json(events))
}

async fn create_folder(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<NewFolderRequest>,
) -> Result<(StatusCode, Json<Folder>), AppError> {
    let folder = state.folders.create_folder(&user_id, req).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn folder_tree(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<FolderNode>>, AppError> {
    let tree = state.folders.folder_tree(&user_id).await?;
    Ok(Json(tree))
}
