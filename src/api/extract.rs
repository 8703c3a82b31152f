use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

pub const USER_HEADER: &str = "x-user-id";

/// Caller identity. Authentication happens upstream; this only reads the id
/// the gateway forwards.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| AppError::validation(format!("missing {} header", USER_HEADER)))?;
        let user_id = value
            .to_str()
            .map_err(|_| AppError::validation(format!("malformed {} header", USER_HEADER)))?
            .trim();
        if user_id.is_empty() {
            return Err(AppError::validation(format!("empty {} header", USER_HEADER)));
        }
        Ok(CurrentUser(user_id.to_string()))
    }
}
