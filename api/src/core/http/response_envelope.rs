//! JSON envelope wrapped around every Quick Catch response.
//!
//! ```text
//! 200/201  {"success": true,  "data": {...}}
//! 4xx/5xx  {"success": false, "error": {"code": "BAD_REQUEST", "message": "...",
//!                                       "details": [{"path": "input_text", "hint": "..."}]}}
//! ```
//!
//! `data` and `error` never appear together; an empty `details` list is omitted.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Stable code clients branch on, e.g. `DUPLICATE_RUN` or `EMAIL_OPT_OUT`.
    pub code: &'static str,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ApiErrorDetail>,
}

/// Points the client at the request field to fix.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiErrorDetail {
    pub fn field(path: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            hint: Some(hint.into()),
        }
    }
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl ApiResponse<()> {
    pub fn error(
        code: &'static str,
        message: impl Into<String>,
        details: Vec<ApiErrorDetail>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
                details,
            }),
        }
    }
}

/// `200 OK` with `data`.
pub fn ok<T: Serialize>(data: T) -> Response {
    ApiResponse::success(data).into_response_with_status(StatusCode::OK)
}

/// `201 Created` with `data`; used when a dump or email row was inserted.
pub fn created<T: Serialize>(data: T) -> Response {
    ApiResponse::success(data).into_response_with_status(StatusCode::CREATED)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, to_value};

    use super::*;

    #[test]
    fn success_omits_error() {
        let body = to_value(ApiResponse::success(json!({"status": "ok"}))).unwrap();
        assert_eq!(body, json!({"success": true, "data": {"status": "ok"}}));
    }

    #[test]
    fn error_omits_data_and_empty_details() {
        let bare = to_value(ApiResponse::error("NOT_FOUND", "brain dump not found", Vec::new())).unwrap();
        assert_eq!(
            bare,
            json!({"success": false, "error": {"code": "NOT_FOUND", "message": "brain dump not found"}})
        );

        let detailed = to_value(ApiResponse::error(
            "BAD_REQUEST",
            "empty dump",
            vec![ApiErrorDetail::field("input_text", "Enter some text.")],
        ))
        .unwrap();
        assert_eq!(
            detailed["error"]["details"],
            json!([{"path": "input_text", "hint": "Enter some text."}])
        );
    }
}
