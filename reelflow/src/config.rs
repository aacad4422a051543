//! Runtime configuration.
//!
//! Values come from serde defaults, builder methods, or the process
//! environment via [`ReelflowConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{ReelflowError, Result};
use crate::pipeline::RetryConfig;

/// Default image style directive.
pub const DEFAULT_STYLE_PROMPT: &str = "modern, sleek, professional product photography";

/// Default camera/motion directive.
pub const DEFAULT_VIDEO_HINT: &str = "smooth camera movement, cinematic lighting";

/// Model identifiers per capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used for market research.
    #[serde(default = "default_analysis_model")]
    pub analysis: String,
    /// Model used for image generation and compositing.
    #[serde(default = "default_image_model")]
    pub image: String,
    /// Model used for video generation.
    #[serde(default = "default_video_model")]
    pub video: String,
}

fn default_analysis_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_image_model() -> String {
    "gemini-3-pro-image-preview".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-generate-preview".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            analysis: default_analysis_model(),
            image: default_image_model(),
            video: default_video_model(),
        }
    }
}

/// Configuration for the pipeline and its backend.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelflowConfig {
    /// API key for the generation backend.
    #[serde(default)]
    pub api_key: String,
    /// Optional billing project sent with every request.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Base URL of the generation API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Directory for generated artifacts.
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,
    /// Directory for uploaded reference images.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    /// Public prefix of artifact locators.
    #[serde(default = "default_output_url_prefix")]
    pub output_url_prefix: String,
    /// Retry policy for remote calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Interval between video status checks in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Overall video wait limit in milliseconds; `0` waits indefinitely.
    #[serde(default = "default_max_video_wait_ms")]
    pub max_video_wait_ms: u64,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    /// Style directive used when a request leaves it empty.
    #[serde(default = "default_style_prompt")]
    pub default_style_prompt: String,
    /// Motion directive used when a request leaves it empty.
    #[serde(default = "default_video_hint")]
    pub default_video_hint: String,
    /// Model identifiers.
    #[serde(default)]
    pub models: ModelConfig,
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_output_url_prefix() -> String {
    "/outputs".to_string()
}

fn default_poll_interval_ms() -> u64 {
    20_000
}

fn default_max_video_wait_ms() -> u64 {
    20 * 60 * 1000
}

fn default_request_timeout() -> f64 {
    120.0
}

fn default_style_prompt() -> String {
    DEFAULT_STYLE_PROMPT.to_string()
}

fn default_video_hint() -> String {
    DEFAULT_VIDEO_HINT.to_string()
}

impl Default for ReelflowConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: None,
            api_base_url: default_api_base_url(),
            outputs_dir: default_outputs_dir(),
            assets_dir: default_assets_dir(),
            output_url_prefix: default_output_url_prefix(),
            retry: RetryConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
            max_video_wait_ms: default_max_video_wait_ms(),
            request_timeout_seconds: default_request_timeout(),
            default_style_prompt: default_style_prompt(),
            default_video_hint: default_video_hint(),
            models: ModelConfig::default(),
        }
    }
}

impl std::fmt::Debug for ReelflowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReelflowConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("project_id", &self.project_id)
            .field("api_base_url", &self.api_base_url)
            .field("outputs_dir", &self.outputs_dir)
            .field("assets_dir", &self.assets_dir)
            .field("retry", &self.retry)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_video_wait_ms", &self.max_video_wait_ms)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl ReelflowConfig {
    /// Creates a configuration with defaults and the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the process environment.
    ///
    /// Fails with `Configuration` when `GCP_API_KEY` is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.api_key = lookup("GCP_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ReelflowError::configuration("GCP_API_KEY is not set"))?;
        config.project_id = lookup("GCP_PROJECT_ID").filter(|p| !p.trim().is_empty());

        if let Some(url) = lookup("GENAI_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(dir) = lookup("OUTPUTS_DIR") {
            config.outputs_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("ASSETS_DIR") {
            config.assets_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = lookup("OUTPUT_URL_PREFIX") {
            config.output_url_prefix = prefix;
        }
        if let Some(model) = lookup("ANALYSIS_MODEL") {
            config.models.analysis = model;
        }
        if let Some(model) = lookup("IMAGE_MODEL") {
            config.models.image = model;
        }
        if let Some(model) = lookup("VIDEO_MODEL") {
            config.models.video = model;
        }

        if let Some(attempts) = parse_var::<usize, _>(&lookup, "RETRY_MAX_ATTEMPTS")? {
            config.retry = config.retry.with_max_attempts(attempts);
        }
        if let Some(base) = parse_var(&lookup, "RETRY_BASE_DELAY_MS")? {
            config.retry = config.retry.with_base_delay_ms(base);
        }
        if let Some(interval) = parse_var(&lookup, "VIDEO_POLL_INTERVAL_MS")? {
            config.poll_interval_ms = interval;
        }
        if let Some(wait) = parse_var(&lookup, "VIDEO_MAX_WAIT_MS")? {
            config.max_video_wait_ms = wait;
        }
        if let Some(timeout) = parse_var(&lookup, "REQUEST_TIMEOUT_SECONDS")? {
            config.request_timeout_seconds = timeout;
        }
        config.request_timeout()?;

        Ok(config)
    }

    /// Sets the project id.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the artifact directories.
    #[must_use]
    pub fn with_dirs(mut self, outputs: impl Into<PathBuf>, assets: impl Into<PathBuf>) -> Self {
        self.outputs_dir = outputs.into();
        self.assets_dir = assets.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the video poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self
    }

    /// Sets the overall video wait limit; `None` waits indefinitely.
    #[must_use]
    pub fn with_max_video_wait(mut self, wait: Option<Duration>) -> Self {
        self.max_video_wait_ms = wait.map_or(0, duration_ms);
        self
    }

    /// Interval between video status checks.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overall video wait limit.
    #[must_use]
    pub fn max_video_wait(&self) -> Option<Duration> {
        (self.max_video_wait_ms > 0).then(|| Duration::from_millis(self.max_video_wait_ms))
    }

    /// HTTP request timeout. Fails for negative, NaN or unbounded values.
    pub fn request_timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.request_timeout_seconds).map_err(|e| {
            ReelflowError::configuration(format!(
                "invalid request timeout {}: {e}",
                self.request_timeout_seconds
            ))
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ReelflowError::configuration(format!("invalid value for {name}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReelflowConfig::default();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.poll_interval(), Duration::from_secs(20));
        assert_eq!(config.max_video_wait(), Some(Duration::from_secs(1200)));
        assert_eq!(config.default_style_prompt, DEFAULT_STYLE_PROMPT);
        assert_eq!(config.models.video, "veo-3.1-generate-preview");
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let err = ReelflowConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ReelflowError::Configuration(_)));

        let err = ReelflowConfig::from_lookup(lookup_from(&[("GCP_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("GCP_API_KEY"));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ReelflowConfig::from_lookup(lookup_from(&[
            ("GCP_API_KEY", "key"),
            ("GCP_PROJECT_ID", "proj"),
            ("OUTPUTS_DIR", "/tmp/out"),
            ("RETRY_MAX_ATTEMPTS", "3"),
            ("VIDEO_POLL_INTERVAL_MS", "500"),
            ("VIDEO_MAX_WAIT_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "key");
        assert_eq!(config.project_id.as_deref(), Some("proj"));
        assert_eq!(config.outputs_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.max_video_wait(), None);
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = ReelflowConfig::from_lookup(lookup_from(&[
            ("GCP_API_KEY", "key"),
            ("RETRY_MAX_ATTEMPTS", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("RETRY_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_unbounded_request_timeout_is_rejected() {
        for raw in ["inf", "NaN", "-1", "1e30"] {
            let err = ReelflowConfig::from_lookup(lookup_from(&[
                ("GCP_API_KEY", "key"),
                ("REQUEST_TIMEOUT_SECONDS", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, ReelflowError::Configuration(_)), "{raw}: {err}");
        }

        let mut config = ReelflowConfig::new("key");
        config.request_timeout_seconds = f64::INFINITY;
        assert!(config.request_timeout().is_err());
        config.request_timeout_seconds = 2.5;
        assert_eq!(config.request_timeout().unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", ReelflowConfig::new("secret-key"));
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ReelflowConfig =
            serde_json::from_value(serde_json::json!({"api_key": "k", "poll_interval_ms": 10})).unwrap();
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.output_url_prefix, "/outputs");
        assert_eq!(config, ReelflowConfig::new("k").with_poll_interval(Duration::from_millis(10)));
    }
}
