use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::clients::ClientCache;
use crate::error::AppError;
use crate::models::{Assignment, Milestone};
use crate::source::SourceRepository;

/// Reads assignments and milestones from a remote planner API.
///
/// Routes, relative to the base URL:
/// `GET assignments/{id}`, `GET users/{user_id}/assignments` and
/// `GET assignments/{id}/milestones`. A 404 on a single assignment means it
/// does not exist; a 404 on a listing means it is empty.
pub struct HttpSource {
    base_url: Url,
    credential: String,
    clients: ClientCache,
}

impl HttpSource {
    /// `base_url` must be able to carry path segments (checked by
    /// `AppConfig`). The HTTP client comes from `clients`, keyed by
    /// `credential`.
    pub fn new(base_url: Url, credential: impl Into<String>, clients: ClientCache) -> Self {
        Self {
            base_url,
            credential: credential.into(),
            clients,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>, AppError> {
        let client = self.clients.get_or_create(&self.credential)?;
        let url = self.url(segments)?;
        debug!("GET {}", url.path());

        let response = client.get(url.clone()).send().await.map_err(request_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "{} returned {}: {}",
                url.path(),
                status,
                body
            )));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| AppError::Upstream(format!("failed to decode {}: {}", url.path(), e)))
    }
}

fn request_error(err: reqwest::Error) -> AppError {
    if err.is_connect() || err.is_timeout() {
        AppError::Unavailable(err.to_string())
    } else {
        AppError::Upstream(err.to_string())
    }
}

#[async_trait]
impl SourceRepository for HttpSource {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, AppError> {
        self.get_json(&["assignments", id]).await
    }

    async fn list_assignments_by_user(&self, user_id: &str) -> Result<Vec<Assignment>, AppError> {
        Ok(self
            .get_json(&["users", user_id, "assignments"])
            .await?
            .unwrap_or_default())
    }

    async fn list_milestones_by_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<Milestone>, AppError> {
        Ok(self
            .get_json(&["assignments", assignment_id, "milestones"])
            .await?
            .unwrap_or_default())
    }
}
