pub mod assignment;
pub mod calendar_event;
pub mod course;
pub mod folder;
pub mod milestone;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use assignment::{Assignment, NewAssignmentRequest};
pub use calendar_event::{CalendarEvent, DueDate, EventStatus, SourceType, UpsertOutcome, parse_due_at};
pub use course::{Course, NewCourseRequest};
pub use folder::{Folder, FolderMetadata, FolderNode, NewFolderRequest, build_folder_tree};
pub use milestone::{Milestone, NewMilestoneRequest, ToggleResult};

#[derive(Debug, Error)]
#[error("failed to decode {field}: {source}")]
pub struct DecodeError {
    pub field: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Decodes a JSON-encoded text column. `None` and blank text decode to
/// `Ok(None)`; anything unparseable is an error and the caller picks the
/// fallback.
pub fn decode_json_field<T: DeserializeOwned>(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, DecodeError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|source| DecodeError { field, source }),
    }
}
