//! Provider client error types.

use crate::outcome::{FailureCode, ProviderAttempt};

/// Longest upstream error body kept in a diagnostic.
const MAX_BODY_CHARS: usize = 300;

/// Errors from a single provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Provider returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Required API key is not configured.
    #[error("Missing {var}")]
    MissingCredential { var: &'static str },
    /// Provider has no match for the query.
    #[error("{message}")]
    NotFound { endpoint: String, message: String },
    /// Response parsed but lacks the fields we need.
    #[error("{message}")]
    MalformedResponse { endpoint: String, message: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ProviderConfigError),
}

impl ProviderError {
    /// Build an [`ProviderError::ApiError`] keeping at most 300 characters of body.
    pub(crate) fn api_error(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        Self::ApiError {
            endpoint: endpoint.into(),
            status,
            body: body.chars().take(MAX_BODY_CHARS).collect(),
        }
    }

    /// Failure classification for resolution metadata.
    pub fn code(&self) -> FailureCode {
        match self {
            Self::Http { .. } => FailureCode::Transport,
            Self::ApiError { .. } => FailureCode::UpstreamStatus,
            Self::Deserialization { .. } | Self::MalformedResponse { .. } => {
                FailureCode::MalformedResponse
            }
            Self::MissingCredential { .. } | Self::Config(_) => FailureCode::MissingCredentials,
            Self::NotFound { .. } => FailureCode::NotFound,
        }
    }

    /// Endpoint the failing call targeted, when there was one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Http { endpoint, .. }
            | Self::ApiError { endpoint, .. }
            | Self::Deserialization { endpoint, .. }
            | Self::NotFound { endpoint, .. }
            | Self::MalformedResponse { endpoint, .. } => Some(endpoint.as_str()),
            Self::MissingCredential { .. } | Self::Config(_) => None,
        }
    }

    /// HTTP status, when the provider answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Record this error as a failed chain attempt.
    pub fn attempt(&self, provider: &str) -> ProviderAttempt {
        ProviderAttempt {
            provider: provider.to_string(),
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Check the status and decode the JSON body, the way every client does.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, ProviderError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::api_error(endpoint, status, &body));
    }
    resp.json().await.map_err(|e| ProviderError::Deserialization {
        endpoint: endpoint.to_string(),
        source: e.without_url(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_truncates_body() {
        let long = "x".repeat(1000);
        let err = ProviderError::api_error("GET /v2", 503, &long);
        match &err {
            ProviderError::ApiError { body, status, .. } => {
                assert_eq!(body.len(), 300);
                assert_eq!(*status, 503);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().starts_with("HTTP 503: "));
        assert_eq!(err.code(), FailureCode::UpstreamStatus);
    }

    #[test]
    fn missing_credential_message_names_variable() {
        let err = ProviderError::MissingCredential { var: "EIA_API_KEY" };
        assert_eq!(err.to_string(), "Missing EIA_API_KEY");
        assert_eq!(err.code(), FailureCode::MissingCredentials);
        let attempt = err.attempt("eia");
        assert_eq!(attempt.provider, "eia");
        assert_eq!(attempt.message, "Missing EIA_API_KEY");
    }
}
