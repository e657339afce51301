//! Caller identity taken from the `X-User-Id` header.
//!
//! Authentication happens in front of this service; handlers only need an
//! owner id to scope every read and write.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error_handler::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
const MAX_USER_ID_LEN: usize = 128;

/// Non-blank, trimmed caller id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;
        if id.len() > MAX_USER_ID_LEN {
            return Err(AppError::BadRequest(format!(
                "X-User-Id longer than {MAX_USER_ID_LEN} bytes"
            )));
        }
        Ok(CurrentUser(id.to_string()))
    }
}
