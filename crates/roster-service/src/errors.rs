//! Roster service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse`
//! impl. Error messages returned to clients are intentionally generic to
//! avoid leaking internal details. Actual errors are logged server-side.

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Roster service error type.
///
/// Maps to appropriate HTTP status codes:
/// - Database, Internal: 500 Internal Server Error
/// - Auth (token stage): 401 Unauthorized
/// - Auth (policy deny): 403 Forbidden
/// - Auth (policy evaluator failure): 500 Internal Server Error
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - BadRequest: 400 Bad Request
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::Database(_) | ApiError::Internal => 500,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::BadRequest(_) => 400,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Auth(err) => {
                // The specific failure is logged here; the client only ever
                // sees the uniform message from the Display impl.
                if err.is_token_stage() {
                    tracing::debug!(target: "roster.auth", kind = err.kind(), "Token rejected");
                    (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", err.to_string())
                } else if let AuthError::PolicyEval(detail) = err {
                    tracing::error!(target: "roster.auth", error = %detail, "Policy evaluation failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "POLICY_ERROR",
                        "An internal error occurred".to_string(),
                    )
                } else {
                    tracing::debug!(target: "roster.auth", kind = err.kind(), "Request denied by policy");
                    (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string())
                }
            }
            ApiError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "roster.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ApiError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            ApiError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            ApiError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            ApiError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "roster.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"roster-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to ApiError.
///
/// Unique-constraint violations (Postgres code 23505) surface as 409 so
/// that duplicate inserts are distinguishable from genuine server faults.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return ApiError::Conflict("Record duplication detected".to_string());
            }
        }
        ApiError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Database("test".to_string()).status_code(), 500);
        assert_eq!(ApiError::Auth(AuthError::TokenMissing).status_code(), 401);
        assert_eq!(ApiError::Auth(AuthError::PolicyDeny).status_code(), 403);
        assert_eq!(
            ApiError::Auth(AuthError::PolicyEval("x".to_string())).status_code(),
            500
        );
        assert_eq!(ApiError::NotFound("test".to_string()).status_code(), 404);
        assert_eq!(ApiError::Conflict("test".to_string()).status_code(), 409);
        assert_eq!(ApiError::BadRequest("test".to_string()).status_code(), 400);
        assert_eq!(
            ApiError::ServiceUnavailable("test".to_string()).status_code(),
            503
        );
        assert_eq!(ApiError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_token_stage_is_uniform_401() {
        for err in [
            AuthError::TokenMissing,
            AuthError::SignatureInvalid,
            AuthError::TokenExpired,
            AuthError::AudienceInvalid,
            AuthError::ScopeInvalid,
        ] {
            let response = ApiError::Auth(err).into_response();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let www_auth = response.headers().get("WWW-Authenticate");
            assert!(www_auth.is_some(), "401 must carry WWW-Authenticate");

            let body_json = read_body_json(response.into_body()).await;
            assert_eq!(body_json["error"]["code"], "INVALID_TOKEN");
            assert_eq!(
                body_json["error"]["message"],
                "auth token was not provided or is invalid"
            );
        }
    }

    #[tokio::test]
    async fn test_into_response_policy_deny() {
        let response = ApiError::Auth(AuthError::PolicyDeny).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "FORBIDDEN");
        assert_eq!(body_json["error"]["message"], "forbidden");
    }

    #[tokio::test]
    async fn test_into_response_policy_eval_error_is_generic_500() {
        let response =
            ApiError::Auth(AuthError::PolicyEval("rule compilation bug".to_string()))
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "POLICY_ERROR");
        // The internal detail must not reach the client
        let message = body_json["error"]["message"].as_str().unwrap();
        assert!(!message.contains("rule compilation bug"));
    }

    #[tokio::test]
    async fn test_into_response_database_error() {
        let error = ApiError::Database("connection failed".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "DATABASE_ERROR");
        assert_eq!(
            body_json["error"]["message"],
            "An internal database error occurred"
        );
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let error = ApiError::NotFound("Person not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "Person not found");
    }

    #[tokio::test]
    async fn test_into_response_conflict() {
        let error = ApiError::Conflict("Record duplication detected".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let error = ApiError::BadRequest("ID is invalid".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_REQUEST");
        assert_eq!(body_json["error"]["message"], "ID is invalid");
    }
}
