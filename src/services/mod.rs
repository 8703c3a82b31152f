pub mod folders;
pub mod progress;
pub mod query;
pub mod reconciler;
pub mod sync_service;

pub use folders::FolderService;
pub use progress::{ProgressService, compute_progress};
pub use query::{MAX_UPCOMING_LIMIT, QueryService};
pub use reconciler::EventReconciler;
pub use sync_service::{SyncFailure, SyncReport, SyncService};

use crate::error::AppError;

const MAX_ID_LEN: usize = 128;

/// Rejects identifiers that are empty, oversized or contain whitespace or
/// control characters.
pub(crate) fn require_id(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::validation(format!("{} must not be empty", field)));
    }
    if value.len() > MAX_ID_LEN {
        return Err(AppError::validation(format!("{} is too long", field)));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::validation(format!("{} is malformed", field)));
    }
    Ok(())
}
