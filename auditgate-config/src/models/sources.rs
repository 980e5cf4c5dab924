use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use auditgate_core::ScoringConfig;

use crate::util::{parse_bool_var, parse_csv_var, parse_var, string_var};

/// Raw configuration as defined in a TOML file.
///
/// Durations are humantime strings such as `"30s"` or `"1m 30s"`; they are
/// parsed by the loader so errors can name the offending field.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub orchestrator: FileOrchestratorConfig,
    #[serde(default)]
    pub breaker: FileBreakerConfig,
    #[serde(default)]
    pub retry: FileRetryConfig,
    pub scoring: Option<ScoringConfig>,
    #[serde(default)]
    pub review: FileReviewConfig,
    #[serde(default)]
    pub scanner: FileScannerConfig,
    pub drafts: Option<FileDraftsConfig>,
    #[serde(default)]
    pub export: FileExportConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileOrchestratorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_enqueue_reviews: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_channel_capacity: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileBreakerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRetryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_backoff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileReviewConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_reject: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScannerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileDraftsConfig {
    pub endpoint: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileExportConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,

    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub cors_allowed_origins: Option<Vec<String>>,

    pub default_concurrency: Option<usize>,
    pub target_timeout: Option<String>,
    pub auto_enqueue_reviews: Option<bool>,
    pub event_channel_capacity: Option<usize>,

    pub breaker_failure_threshold: Option<u32>,
    pub breaker_success_threshold: Option<u32>,
    pub breaker_cooldown: Option<String>,

    pub retry_max_attempts: Option<u32>,
    pub retry_initial_backoff: Option<String>,
    pub retry_max_backoff: Option<String>,

    pub review_auto_reject: Option<bool>,

    pub scanner_endpoint: Option<String>,
    pub drafts_endpoint: Option<String>,
    pub drafts_timeout: Option<String>,

    pub export_dir: Option<PathBuf>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: string_var("AUDITGATE_CONFIG").map(PathBuf::from),

            server_host: string_var("AUDITGATE_HOST"),
            server_port: parse_var("AUDITGATE_PORT"),
            cors_allowed_origins: parse_csv_var("AUDITGATE_CORS_ORIGINS"),

            default_concurrency: parse_var("AUDITGATE_DEFAULT_CONCURRENCY"),
            target_timeout: string_var("AUDITGATE_TARGET_TIMEOUT"),
            auto_enqueue_reviews: parse_bool_var(
                "AUDITGATE_AUTO_ENQUEUE_REVIEWS",
            ),
            event_channel_capacity: parse_var(
                "AUDITGATE_EVENT_CHANNEL_CAPACITY",
            ),

            breaker_failure_threshold: parse_var(
                "AUDITGATE_BREAKER_FAILURE_THRESHOLD",
            ),
            breaker_success_threshold: parse_var(
                "AUDITGATE_BREAKER_SUCCESS_THRESHOLD",
            ),
            breaker_cooldown: string_var("AUDITGATE_BREAKER_COOLDOWN"),

            retry_max_attempts: parse_var("AUDITGATE_RETRY_MAX_ATTEMPTS"),
            retry_initial_backoff: string_var(
                "AUDITGATE_RETRY_INITIAL_BACKOFF",
            ),
            retry_max_backoff: string_var("AUDITGATE_RETRY_MAX_BACKOFF"),

            review_auto_reject: parse_bool_var("AUDITGATE_REVIEW_AUTO_REJECT"),

            scanner_endpoint: string_var("AUDITGATE_SCANNER_URL"),
            drafts_endpoint: string_var("AUDITGATE_DRAFTS_URL"),
            drafts_timeout: string_var("AUDITGATE_DRAFTS_TIMEOUT"),

            export_dir: string_var("AUDITGATE_EXPORT_DIR").map(PathBuf::from),
        }
    }
}
