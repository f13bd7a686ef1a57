//! Domain error taxonomy and its HTTP mapping.
//!
//! Forbidden is surfaced identically to NotFound at the API boundary so an
//! unauthorized caller cannot probe which resources exist.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Referenced defect/project/user id does not resolve.
    #[error("resource not found")]
    NotFound,

    /// Principal lacks the role, ownership, or grant for the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Requested status change is not an allowed workflow edge, or the
    /// actor does not satisfy the edge's constraint.
    #[error("{0}")]
    InvalidTransition(String),

    /// A required lookup row is absent. Deployment misconfiguration.
    #[error("required seed row missing: {0}")]
    SeedDataMissing(&'static str),

    /// Underlying persistence unavailable or inconsistent.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<diesel::result::Error> for ServerError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => ServerError::NotFound,
            other => ServerError::Storage(other.into()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            // Deliberately indistinguishable.
            ServerError::NotFound | ServerError::Forbidden(_) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            ServerError::InvalidTransition(reason) => {
                (StatusCode::CONFLICT, reason.clone())
            }
            ServerError::SeedDataMissing(_) | ServerError::Storage(_) => {
                tracing::error!(error = %self, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (code, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_indistinguishable_from_not_found() {
        let not_found = ServerError::NotFound.into_response();
        let forbidden =
            ServerError::Forbidden("no access to project".into()).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(forbidden.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_transition_maps_to_conflict() {
        let resp =
            ServerError::InvalidTransition("Only a manager can close a defect.".into())
                .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn storage_and_seed_errors_are_internal() {
        let storage = ServerError::Storage(anyhow::anyhow!("connection refused"));
        assert_eq!(
            storage.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let seed = ServerError::SeedDataMissing("status 'New'");
        assert_eq!(
            seed.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
