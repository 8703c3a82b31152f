use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::{Assignment, SourceType, UpsertOutcome};
use crate::services::reconciler::EventReconciler;
use crate::services::require_id;

pub struct SyncService {
    reconciler: Arc<EventReconciler>,
    concurrency: usize,
}

/// Summary of one whole-user pass. Counts are events that exist after the
/// pass; `inserted` is how many of them this pass created.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub assignment_events: usize,
    pub milestone_events: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failures: Vec<SyncFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub source_type: SourceType,
    pub source_id: String,
    pub message: String,
}

/// Result of reconciling one source entity.
struct EntityResult {
    source_type: SourceType,
    source_id: String,
    result: Result<Option<UpsertOutcome>, AppError>,
}

impl SyncReport {
    /// Folds one entity result in. A connection-level failure ends the fold.
    fn absorb(mut self, entity: EntityResult) -> Result<Self, AppError> {
        match entity.result {
            Ok(Some(outcome)) => {
                match entity.source_type {
                    SourceType::AssignmentDeadline => self.assignment_events += 1,
                    SourceType::Milestone => self.milestone_events += 1,
                    SourceType::Custom => {}
                }
                if outcome == UpsertOutcome::Inserted {
                    self.inserted += 1;
                }
            }
            Ok(None) => self.skipped += 1,
            Err(e) if e.is_connection_failure() => return Err(e),
            Err(e) => {
                warn!(
                    "failed to reconcile {} {}: {}",
                    entity.source_type.as_str(),
                    entity.source_id,
                    e
                );
                self.failures.push(SyncFailure {
                    source_type: entity.source_type,
                    source_id: entity.source_id,
                    message: e.to_string(),
                });
            }
        }
        Ok(self)
    }
}

impl SyncService {
    pub fn new(reconciler: Arc<EventReconciler>, concurrency: usize) -> Self {
        Self {
            reconciler,
            concurrency: concurrency.max(1),
        }
    }

    /// Reconciles every deadline and milestone of `user_id`.
    ///
    /// Best effort: a failing entity is recorded in `failures` and the pass
    /// goes on. Losing the storage connection aborts the pass and cancels the
    /// remaining workers.
    pub async fn sync_user_events(&self, user_id: &str) -> Result<SyncReport, AppError> {
        require_id("user_id", user_id)?;
        info!("Starting calendar sync for {}", user_id);

        let assignments = self.reconciler.source().list_assignments_by_user(user_id).await?;
        let total = assignments.len();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();
        for assignment in assignments {
            let semaphore = semaphore.clone();
            let reconciler = self.reconciler.clone();
            workers.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| AppError::InternalServerError)?;
                Ok::<_, AppError>(reconcile_assignment(&reconciler, assignment).await)
            });
        }

        let mut report = SyncReport::default();
        while let Some(joined) = workers.join_next().await {
            let entities = match joined {
                Ok(entities) => entities?,
                Err(e) => {
                    error!("sync worker failed: {}", e);
                    return Err(AppError::InternalServerError);
                }
            };
            report = entities
                .into_iter()
                .try_fold(report, |report, entity| report.absorb(entity))?;
        }
        report.failures.sort_by(|a, b| a.source_id.cmp(&b.source_id));

        info!(
            "Calendar sync for {} done over {} assignments: {} deadline events, {} milestone events, {} inserted, {} failed",
            user_id,
            total,
            report.assignment_events,
            report.milestone_events,
            report.inserted,
            report.failures.len()
        );
        Ok(report)
    }
}

/// Reconciles one assignment's deadline and milestones, yielding a result per
/// entity. Never fails as a whole; failures are carried per entity.
async fn reconcile_assignment(reconciler: &EventReconciler, assignment: Assignment) -> Vec<EntityResult> {
    let mut results = Vec::new();

    results.push(EntityResult {
        source_type: SourceType::AssignmentDeadline,
        source_id: assignment.id.clone(),
        result: reconciler
            .reconcile_deadline(&assignment)
            .await
            .map(|r| r.map(|(_, outcome)| outcome)),
    });

    match reconciler.source().list_milestones_by_assignment(&assignment.id).await {
        Ok(mut milestones) => {
            milestones.sort_by(|a, b| a.id.cmp(&b.id));
            for milestone in &milestones {
                results.push(EntityResult {
                    source_type: SourceType::Milestone,
                    source_id: milestone.id.clone(),
                    result: reconciler
                        .reconcile_milestone(&assignment, milestone)
                        .await
                        .map(|r| r.map(|(_, outcome)| outcome)),
                });
            }
        }
        // The milestones themselves are unknown, so the failure is filed
        // against the assignment.
        Err(e) => results.push(EntityResult {
            source_type: SourceType::Milestone,
            source_id: assignment.id.clone(),
            result: Err(e),
        }),
    }

    results
}
