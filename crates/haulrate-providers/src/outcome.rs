//! Tagged resolution results.
//!
//! Resolvers never return `Err` for upstream trouble. They return a
//! [`Resolution`]: either the value with provenance, or a structured failure
//! carrying a [`FailureCode`], a message, and what each provider said.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine-readable reason a resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    /// Caller input could not be normalized (bad postal or country code).
    BadInput,
    /// A required API key is not configured.
    MissingCredentials,
    /// Connection, timeout, or other transport error.
    Transport,
    /// Provider answered with a non-2xx status.
    UpstreamStatus,
    /// Provider answered 2xx with a body we could not use.
    MalformedResponse,
    /// Provider answered but had no match.
    NotFound,
    /// The origin could not be geocoded.
    OriginGeocodeFailed,
    /// The destination could not be geocoded.
    DestGeocodeFailed,
    /// Both ends geocoded but the routing provider produced no route.
    NoRoute,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Cache,
    Provider,
}

/// One provider's failed attempt inside a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub code: FailureCode,
    pub message: String,
}

/// Provenance of a resolved value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionMeta {
    pub source: ResolutionSource,
    /// Provider that produced the value (also set on cache hits).
    pub provider: String,
    /// When the cached entry was written; only on cache hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    /// Providers that failed before the one that succeeded.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_attempts: Vec<ProviderAttempt>,
    /// Provider-specific context (e.g. the geocodes used for a route).
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub details: serde_json::Value,
}

impl ResolutionMeta {
    /// Fresh value from `provider`.
    pub fn provider(provider: impl Into<String>, failed_attempts: Vec<ProviderAttempt>) -> Self {
        Self {
            source: ResolutionSource::Provider,
            provider: provider.into(),
            cached_at: None,
            failed_attempts,
            details: serde_json::Value::Null,
        }
    }

    /// Cache hit for a value originally produced by `provider`.
    pub fn cache(provider: impl Into<String>, cached_at: DateTime<Utc>) -> Self {
        Self {
            source: ResolutionSource::Cache,
            provider: provider.into(),
            cached_at: Some(cached_at),
            failed_attempts: Vec::new(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// A failed resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionFailure {
    pub code: FailureCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attempts: Vec<ProviderAttempt>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub details: serde_json::Value,
}

impl ResolutionFailure {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            attempts: Vec::new(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<ProviderAttempt>) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Result of a provider-backed lookup. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution<T> {
    Resolved { value: T, meta: ResolutionMeta },
    Failed { failure: ResolutionFailure },
}

impl<T> Resolution<T> {
    pub fn resolved(value: T, meta: ResolutionMeta) -> Self {
        Self::Resolved { value, meta }
    }

    pub fn failed(failure: ResolutionFailure) -> Self {
        Self::Failed { failure }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Resolved { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&ResolutionFailure> {
        match self {
            Self::Resolved { .. } => None,
            Self::Failed { failure } => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<(T, ResolutionMeta), ResolutionFailure> {
        match self {
            Self::Resolved { value, meta } => Ok((value, meta)),
            Self::Failed { failure } => Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_serializes_with_status_tag() {
        let ok: Resolution<u32> = Resolution::resolved(7, ResolutionMeta::provider("zippopotam", vec![]));
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["status"], "resolved");
        assert_eq!(v["value"], 7);
        assert_eq!(v["meta"]["source"], "provider");
        assert!(v["meta"].get("cached_at").is_none());

        let failed: Resolution<u32> = Resolution::failed(
            ResolutionFailure::new(FailureCode::NotFound, "ZIP not found").with_attempts(vec![
                ProviderAttempt {
                    provider: "zippopotam".into(),
                    code: FailureCode::NotFound,
                    message: "ZIP not found".into(),
                },
            ]),
        );
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["failure"]["code"], "NOT_FOUND");
        assert_eq!(v["failure"]["attempts"][0]["provider"], "zippopotam");
    }

    #[test]
    fn accessors() {
        let ok: Resolution<&str> = Resolution::resolved("x", ResolutionMeta::provider("p", vec![]));
        assert!(ok.is_resolved());
        assert_eq!(ok.value(), Some(&"x"));
        assert!(ok.failure().is_none());

        let bad: Resolution<&str> = Resolution::failed(ResolutionFailure::new(FailureCode::BadInput, "Bad ZIP"));
        assert!(!bad.is_resolved());
        assert_eq!(bad.clone().into_result().unwrap_err().message, "Bad ZIP");
        assert_eq!(bad.failure().map(|f| f.code), Some(FailureCode::BadInput));
    }
}
