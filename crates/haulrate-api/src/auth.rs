//! # Authentication & Broker Scoping
//!
//! Bearer token middleware that resolves the acting party.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {actor_id}:{broker_id}:{secret}   scoped to one broker (empty broker_id = unscoped)
//! Bearer {secret}                           unscoped administrator
//! ```
//!
//! The secret is compared in constant time. When no secret is configured
//! every request runs as the unscoped `system` actor.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::LoadRecord;

/// Actor recorded when auth is disabled.
pub const SYSTEM_ACTOR: &str = "system";

/// Actor recorded for a bare-secret token.
pub const ADMIN_ACTOR: &str = "admin";

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Opaque id of the acting party, recorded in the audit log.
    pub actor_id: String,
    /// Broker the caller acts for. `None` means unscoped.
    pub broker_id: Option<String>,
}

impl CallerIdentity {
    pub fn unscoped(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            broker_id: None,
        }
    }

    /// Unscoped callers see every load; scoped callers only their broker's.
    pub fn can_access_load(&self, load: &LoadRecord) -> bool {
        match &self.broker_id {
            None => true,
            Some(caller) => load.broker_id.as_deref() == Some(caller.as_str()),
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Returns 403 unless the caller may act on `load`.
pub fn require_load_access(caller: &CallerIdentity, load: &LoadRecord) -> Result<(), AppError> {
    if caller.can_access_load(load) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "load {} is outside the caller's broker scope",
            load.id
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets. A length mismatch still
/// performs a comparison so timing does not depend on which check failed.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse `{actor_id}:{broker_id}:{secret}` or a bare `{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::unscoped(ADMIN_ACTOR))
            } else {
                Err("invalid bearer token".into())
            }
        }
        [actor, broker, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let actor = actor.trim();
            if actor.is_empty() {
                return Err("actor_id must not be empty".into());
            }
            let broker = broker.trim();
            Ok(CallerIdentity {
                actor_id: actor.to_string(),
                broker_id: (!broker.is_empty()).then(|| broker.to_string()),
            })
        }
        _ => Err("invalid token format, expected {actor_id}:{broker_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject the resulting [`CallerIdentity`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header.and_then(|v| v.strip_prefix("Bearer ")) {
                Some(provided) => match parse_bearer_token(provided, expected) {
                    Ok(identity) => {
                        request.extensions_mut().insert(identity);
                        next.run(request).await
                    }
                    Err(msg) => {
                        tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                        unauthorized_response(&msg)
                    }
                },
                None if auth_header.is_some() => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            request
                .extensions_mut()
                .insert(CallerIdentity::unscoped(SYSTEM_ACTOR));
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
