pub mod sources;

use std::{path::PathBuf, time::Duration};

use auditgate_core::{
    BreakerConfig, OrchestratorConfig, ReviewConfig, ScoringConfig,
};
use url::Url;

/// Fully resolved configuration handed to the server.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub orchestrator: OrchestratorConfig,
    /// Defaults for every breaker in the registry.
    pub breaker: BreakerConfig,
    pub scoring: ScoringConfig,
    pub review: ReviewConfig,
    pub scanner: ScannerConfig,
    /// `None` disables remediation drafts entirely.
    pub drafts: Option<DraftsConfig>,
    pub export: ExportConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.cors_allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub endpoint: Url,
}

#[derive(Debug, Clone)]
pub struct DraftsConfig {
    pub endpoint: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
