//! Authentication pipeline middleware.
//!
//! Two stages over shared [`AuthState`]:
//!
//! - [`require_auth`] extracts and verifies the bearer token, validates
//!   its claims and injects the resulting [`Principal`] into request
//!   extensions; any failure short-circuits with 401.
//! - [`enforce_policy`] evaluates the request descriptor against the
//!   prepared policy; deny short-circuits with 403, an evaluator failure
//!   with 500.
//!
//! The stage order on protected routes is a configuration choice made in
//! the router, not here.

use crate::auth::token::{bearer_token_lenient, extract_bearer};
use crate::auth::{AuthError, AuthService, Principal, RequestDescriptor};
use crate::errors::ApiError;
use crate::observability::metrics::{record_auth_check, record_policy_decision};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware stages.
#[derive(Clone)]
pub struct AuthState {
    /// The composed auth service.
    pub auth: Arc<AuthService>,
}

/// Token-stage middleware.
///
/// Extracts `Authorization: Bearer <token>`, verifies the JWT against the
/// key cache, validates its claims, then stores the principal in request
/// extensions for downstream handlers.
///
/// # Response
///
/// Returns 401 Unauthorized with a uniform body and `WWW-Authenticate`
/// header when the token is missing or fails any check.
#[instrument(skip(state, req, next), name = "roster.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let principal = {
        let token = extract_bearer(req.headers()).inspect_err(|e| {
            record_auth_check(e.kind());
        })?;

        state.auth.authenticate(token).await.inspect_err(|e| {
            record_auth_check(e.kind());
        })?
    };

    record_auth_check("ok");

    // Store the principal in request extensions for downstream handlers
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Policy-stage middleware.
///
/// Builds the request descriptor (method, path, raw token) and asks the
/// prepared policy for a decision. The raw token is passed even when the
/// token stage has not run or has failed; the policy decides what to do
/// with unauthenticated requests.
#[instrument(skip(state, req, next), name = "roster.middleware.policy")]
pub async fn enforce_policy(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let decision = {
        let descriptor = RequestDescriptor {
            method: req.method().as_str(),
            path: req.uri().path(),
            token: bearer_token_lenient(req.headers()),
        };

        state
            .auth
            .evaluate_policy(&descriptor)
            .map_err(|e| {
                record_policy_decision("error");
                AuthError::PolicyEval(e.to_string())
            })?
    };

    if !decision.allowed {
        record_policy_decision("deny");
        return Err(AuthError::PolicyDeny.into());
    }

    record_policy_decision("allow");
    Ok(next.run(req).await)
}

/// Extension trait for extracting the principal from a request.
///
/// Provides a convenient method for handlers to get the authenticated
/// principal.
#[allow(dead_code)] // API for handlers that need the principal from a request
pub trait PrincipalExt {
    /// Get the authenticated principal from request extensions.
    ///
    /// Returns `None` if the token stage was not applied to this request.
    fn principal(&self) -> Option<&Principal>;
}

#[allow(dead_code)] // Implementation for PrincipalExt trait
impl<B> PrincipalExt for axum::extract::Request<B> {
    fn principal(&self) -> Option<&Principal> {
        self.extensions().get::<Principal>()
    }
}
