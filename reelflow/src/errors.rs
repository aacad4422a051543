//! Error types for the reelflow pipeline.
//!
//! The taxonomy separates transport-level transience, which the retry
//! executor absorbs, from terminal per-zone failures, which halt a run and
//! surface on the task record.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = ReelflowError> = std::result::Result<T, E>;

/// The main error type for reelflow operations.
#[derive(Debug, Error)]
pub enum ReelflowError {
    /// Network, rate-limit or server-side failure that may succeed on retry.
    #[error("Transient remote error: {0}")]
    TransientRemote(String),

    /// The remote refused the request outright (non-retryable 4xx).
    #[error("Remote rejected request ({status}): {message}")]
    RemoteRejected {
        /// HTTP-like status code reported by the backend.
        status: u16,
        /// Body or reason returned by the backend.
        message: String,
    },

    /// Every attempt of a retried operation failed.
    #[error("Retry exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// The error from the final attempt.
        #[source]
        source: Box<ReelflowError>,
    },

    /// The remote answered, but the payload does not match the expected schema.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The remote answered without the requested image payload.
    #[error("No artifact produced: {0}")]
    NoArtifactProduced(String),

    /// The video operation finished without any result.
    #[error("Video operation finished without result data ({0})")]
    NoResultData(String),

    /// The video result lists entries but none carries a downloadable file.
    #[error("Video result contains no downloadable entry")]
    NoDownloadableArtifact,

    /// The video operation did not finish within the configured wait.
    #[error("Video operation '{operation}' still running after {waited_ms}ms")]
    PollTimeout {
        /// Operation name being polled.
        operation: String,
        /// Milliseconds spent waiting.
        waited_ms: u64,
    },

    /// A required credential or setting is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No task is registered under the identifier.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A task with the identifier already exists.
    #[error("Task already exists: {0}")]
    DuplicateTask(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned run terminated abnormally.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ReelflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl ReelflowError {
    /// Creates a transient remote error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientRemote(message.into())
    }

    /// Creates a malformed response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Creates a no-artifact error.
    #[must_use]
    pub fn no_artifact(message: impl Into<String>) -> Self {
        Self::NoArtifactProduced(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wraps the last error of an exhausted retry loop.
    #[must_use]
    pub fn retry_exhausted(attempts: usize, last: Self) -> Self {
        Self::RetryExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    /// Returns true if re-invoking the failed operation may succeed.
    ///
    /// Validation failures are retryable: generation models are not
    /// deterministic and a second request can return a usable payload.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::RemoteRejected { .. }
                | Self::RetryExhausted { .. }
                | Self::PollTimeout { .. }
                | Self::Configuration(_)
                | Self::TaskNotFound(_)
                | Self::DuplicateTask(_)
                | Self::Internal(_)
        )
    }

    /// Returns the innermost error, looking through `RetryExhausted`.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::RetryExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Best-effort classification of a failure for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHint {
    /// Quota or rate limit reached.
    RateLimited,
    /// Credential lacks permission for the model or project.
    PermissionDenied,
    /// Content was blocked by a safety filter.
    SafetyBlocked,
}

static RATE_LIMIT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b429\b|rate.?limit|quota|resource.?exhausted").ok());
static PERMISSION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b403\b|permission.?denied|forbidden").ok());
static SAFETY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)safety").ok());

fn pattern_hits(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

impl FailureHint {
    /// Classifies an error message. Rate limiting wins over permission,
    /// permission over safety.
    #[must_use]
    pub fn classify(text: &str) -> Option<Self> {
        if pattern_hits(&RATE_LIMIT_PATTERN, text) {
            Some(Self::RateLimited)
        } else if pattern_hits(&PERMISSION_PATTERN, text) {
            Some(Self::PermissionDenied)
        } else if pattern_hits(&SAFETY_PATTERN, text) {
            Some(Self::SafetyBlocked)
        } else {
            None
        }
    }

    /// Returns advice shown to the user.
    #[must_use]
    pub fn advice(self) -> &'static str {
        match self {
            Self::RateLimited => "Quota exceeded, wait a moment and try again.",
            Self::PermissionDenied => "Permission denied, check the API key and project settings.",
            Self::SafetyBlocked => "Blocked by a safety filter, try a different keyword.",
        }
    }
}

/// Renders an error for the failed stage record, appending a hint when the
/// text matches a known category.
#[must_use]
pub fn enrich_failure_message(error: &ReelflowError) -> String {
    let text = error.to_string();
    match FailureHint::classify(&text) {
        Some(hint) => format!("{text} ({})", hint.advice()),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_exhausted_root_cause() {
        let err = ReelflowError::retry_exhausted(5, ReelflowError::no_artifact("no image"));

        assert!(err.to_string().contains("5 attempts"));
        assert!(matches!(err.root_cause(), ReelflowError::NoArtifactProduced(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ReelflowError::transient("503").is_retryable());
        assert!(ReelflowError::malformed("bad json").is_retryable());
        assert!(!ReelflowError::configuration("missing key").is_retryable());
        assert!(!ReelflowError::RemoteRejected { status: 403, message: "no".into() }.is_retryable());
        assert!(!ReelflowError::retry_exhausted(5, ReelflowError::transient("x")).is_retryable());
    }

    #[test]
    fn test_failure_hint_classify() {
        assert_eq!(FailureHint::classify("HTTP 429 Too Many Requests"), Some(FailureHint::RateLimited));
        assert_eq!(FailureHint::classify("RESOURCE_EXHAUSTED"), Some(FailureHint::RateLimited));
        assert_eq!(FailureHint::classify("status 403"), Some(FailureHint::PermissionDenied));
        assert_eq!(FailureHint::classify("blocked by Safety settings"), Some(FailureHint::SafetyBlocked));
        assert_eq!(FailureHint::classify("connection reset"), None);
        // 4290 is not a rate-limit status
        assert_eq!(FailureHint::classify("id 4290"), None);
    }

    #[test]
    fn test_enrich_failure_message() {
        let err = ReelflowError::retry_exhausted(
            5,
            ReelflowError::transient("HTTP 429: quota"),
        );
        let message = enrich_failure_message(&err);
        assert!(message.contains("429"));
        assert!(message.ends_with("(Quota exceeded, wait a moment and try again.)"));

        let plain = enrich_failure_message(&ReelflowError::NoDownloadableArtifact);
        assert_eq!(plain, "Video result contains no downloadable entry");
    }

    #[test]
    fn test_from_serde_error() {
        let err: ReelflowError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, ReelflowError::Serialization(_)));
    }
}
