use serde::{Deserialize, Serialize};
use serde_json::Value;

/// # NDOC
/// component: `contracts`
/// purpose: Standard result alias for typed pipeline stages.
pub type StageResult<T> = Result<T, PipelineError>;

/// # NDOC
/// component: `contracts`
/// purpose: Stable machine-readable pipeline error category.
/// invariants:
///   - Variants are part of the external API surface; changes require compatibility review.
///   - Only `ConfigError` and `ServiceUnavailable` may propagate to the deck caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PipelineErrorKind {
    ConfigError,
    ServiceUnavailable,
    ContractViolation,
    ValidationError,
    RateLimitError,
    OverloadedError,
    TimeoutError,
    ProviderError,
    InternalError,
}

/// # NDOC
/// component: `contracts`
/// purpose: Canonical error payload used across agents, gateway, and orchestrator.
/// invariants:
///   - `message` is user-safe.
///   - `retryable` indicates whether the gateway may retry on the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineError {
    pub kind: PipelineErrorKind,
    pub message: String,
    pub retryable: bool,
    pub details: Option<Value>,
}

impl PipelineError {
    pub fn new(
        kind: PipelineErrorKind,
        message: impl Into<String>,
        retryable: bool,
        details: Option<Value>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            details,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::ConfigError, message, false, None)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::ServiceUnavailable, message, false, None)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::ContractViolation, message, false, None)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::ValidationError, message, false, None)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::RateLimitError, message, true, None)
    }

    pub fn overloaded(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::OverloadedError, message, true, None)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::TimeoutError, message, true, None)
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(PipelineErrorKind::ProviderError, message, retryable, None)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::InternalError, message, false, None)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Transient failures are the only ones eligible for same-model retry
    /// and fallback-chain descent.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            PipelineErrorKind::RateLimitError
                | PipelineErrorKind::OverloadedError
                | PipelineErrorKind::TimeoutError
        )
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::internal(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::validation(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_builders_set_expected_values() {
        let err = PipelineError::rate_limit("quota exhausted");
        assert_eq!(err.kind, PipelineErrorKind::RateLimitError);
        assert!(err.retryable);
        assert!(err.is_transient());
        assert_eq!(err.message, "quota exhausted");
    }

    #[test]
    fn contract_errors_are_not_transient() {
        let err = PipelineError::contract("unrecoverable JSON");
        assert!(!err.is_transient());
        assert!(!err.retryable);
    }

    #[test]
    fn details_round_trip_through_serde() {
        let err = PipelineError::validation("bad component")
            .with_details(serde_json::json!({"field": "metrics"}));
        let encoded = serde_json::to_string(&err).expect("serialize");
        let decoded: PipelineError = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded.kind, PipelineErrorKind::ValidationError);
        assert_eq!(decoded.details.unwrap()["field"], "metrics");
    }
}
