pub mod appointments;
pub mod availability;
pub mod health;

use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::services::booking::{Actor, Role};

/// Reads the caller identity established by the upstream auth layer. This
/// service sits behind a gateway that authenticates requests and forwards
/// the subject in `x-user-id` / `x-user-role`.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or(AppError::Unauthorized)?;

    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or(AppError::Unauthorized)?;

    Ok(Actor { user_id, role })
}
