use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// The authenticated user on whose behalf a request runs.
///
/// Authentication itself happens in the upstream gateway, which verifies the
/// identity-provider session and injects `x-user-id` before proxying here.
/// Resolving the user from an explicit header rather than ambient session
/// state keeps every handler testable with arbitrary user fixtures.
///
/// `FromRequestParts` returns `401` when the header is missing or empty.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
}

/// Rejection returned by [`UserContext`]'s `FromRequestParts` impl.
pub struct MissingUser;

impl IntoResponse for MissingUser {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": { "code": "unauthorized", "message": "Unauthorized", "field": null }
            })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = MissingUser;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(MissingUser)?
            .to_string();

        Ok(UserContext { user_id })
    }
}
