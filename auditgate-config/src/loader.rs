use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use auditgate_core::{
    BreakerConfig, OrchestratorConfig, RetryPolicy, ReviewConfig,
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
    models::{
        Config, ConfigMetadata, DraftsConfig, ExportConfig, ScannerConfig,
        ServerConfig,
        sources::{EnvConfig, FileConfig},
    },
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

const DEFAULT_CONFIG_LOCATIONS: &[&str] =
    &["auditgate.toml", "config/auditgate.toml"];

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SCANNER_ENDPOINT: &str = "http://127.0.0.1:9400/v1/check";
const DEFAULT_DRAFTS_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_EXPORT_DIR: &str = "./exports";

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = compose_config(
            file_config,
            env_config,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(Path::new)
                .find(|candidate| candidate.exists())
            {
                Some(found) => found.to_path_buf(),
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok((Some(file_config), Some(path)))
    }
}

/// Parses one TOML configuration file.
pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merges file and environment values (environment wins), fills defaults and
/// applies guard rails.
fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No auditgate.toml detected; using environment variables and defaults",
            "Create auditgate.toml or set AUDITGATE_CONFIG to point at one",
        );
    }

    let FileConfig {
        server: file_server,
        orchestrator: file_orchestrator,
        breaker: file_breaker,
        retry: file_retry,
        scoring: file_scoring,
        review: file_review,
        scanner: file_scanner,
        drafts: file_drafts,
        export: file_export,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        cors_allowed_origins: env
            .cors_allowed_origins
            .or(file_server.cors_allowed_origins)
            .unwrap_or_else(default_cors_origins),
    };

    let orchestrator_defaults = OrchestratorConfig::default();
    let retry_defaults = RetryPolicy::default();
    let retry = RetryPolicy {
        max_attempts: env
            .retry_max_attempts
            .or(file_retry.max_attempts)
            .unwrap_or(retry_defaults.max_attempts),
        initial_backoff: duration(
            "retry.initial_backoff",
            env.retry_initial_backoff.or(file_retry.initial_backoff),
            retry_defaults.initial_backoff,
        )?,
        max_backoff: duration(
            "retry.max_backoff",
            env.retry_max_backoff.or(file_retry.max_backoff),
            retry_defaults.max_backoff,
        )?,
        multiplier: file_retry
            .multiplier
            .unwrap_or(retry_defaults.multiplier),
    };

    let orchestrator = OrchestratorConfig {
        default_concurrency: env
            .default_concurrency
            .or(file_orchestrator.default_concurrency)
            .unwrap_or(orchestrator_defaults.default_concurrency),
        target_timeout: duration(
            "orchestrator.target_timeout",
            env.target_timeout.or(file_orchestrator.target_timeout),
            orchestrator_defaults.target_timeout,
        )?,
        retry,
        auto_enqueue_reviews: env
            .auto_enqueue_reviews
            .or(file_orchestrator.auto_enqueue_reviews)
            .unwrap_or(orchestrator_defaults.auto_enqueue_reviews),
        event_channel_capacity: env
            .event_channel_capacity
            .or(file_orchestrator.event_channel_capacity)
            .unwrap_or(orchestrator_defaults.event_channel_capacity),
    };

    let breaker_defaults = BreakerConfig::default();
    let breaker = BreakerConfig {
        failure_threshold: env
            .breaker_failure_threshold
            .or(file_breaker.failure_threshold)
            .unwrap_or(breaker_defaults.failure_threshold),
        success_threshold: env
            .breaker_success_threshold
            .or(file_breaker.success_threshold)
            .unwrap_or(breaker_defaults.success_threshold),
        cooldown: duration(
            "breaker.cooldown",
            env.breaker_cooldown.or(file_breaker.cooldown),
            breaker_defaults.cooldown,
        )?,
    };

    let review = ReviewConfig {
        auto_reject: env
            .review_auto_reject
            .or(file_review.auto_reject)
            .unwrap_or(false),
    };

    let scanner = ScannerConfig {
        endpoint: match env.scanner_endpoint {
            Some(raw) => parse_url("scanner.endpoint", &raw)?,
            None => match file_scanner.endpoint {
                Some(endpoint) => endpoint,
                None => {
                    parse_url("scanner.endpoint", DEFAULT_SCANNER_ENDPOINT)?
                }
            },
        },
    };

    let drafts_endpoint = match env.drafts_endpoint {
        Some(raw) => Some(parse_url("drafts.endpoint", &raw)?),
        None => file_drafts.as_ref().map(|drafts| drafts.endpoint.clone()),
    };
    let drafts = match drafts_endpoint {
        Some(endpoint) => Some(DraftsConfig {
            endpoint,
            timeout: duration(
                "drafts.timeout",
                env.drafts_timeout
                    .or(file_drafts.and_then(|drafts| drafts.timeout)),
                DEFAULT_DRAFTS_TIMEOUT,
            )?,
        }),
        None => None,
    };

    let export = ExportConfig {
        dir: env
            .export_dir
            .or(file_export.dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR)),
    };

    let config = Config {
        server,
        orchestrator,
        breaker,
        scoring: file_scoring.unwrap_or_default(),
        review,
        scanner,
        drafts,
        export,
        metadata,
    };

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

fn duration(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(value) => humantime::parse_duration(value.trim()).map_err(
            |source| ConfigLoadError::InvalidDuration {
                field,
                value,
                source,
            },
        ),
        None => Ok(default),
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigLoadError> {
    Url::parse(raw.trim()).map_err(|source| ConfigLoadError::InvalidUrl {
        field,
        value: raw.to_string(),
        source,
    })
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid URL '{value}' for {field}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose(
        file: Option<FileConfig>,
        env: EnvConfig,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        compose_config(file, env, ConfigMetadata::default())
    }

    fn parse(toml_src: &str) -> FileConfig {
        toml::from_str(toml_src).expect("valid toml")
    }

    #[test]
    fn defaults_pass_guard_rails() {
        let (config, warnings) =
            compose(None, EnvConfig::default()).expect("defaults are valid");

        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.orchestrator, OrchestratorConfig::default());
        assert!(config.orchestrator.auto_enqueue_reviews);
        assert_eq!(config.breaker, BreakerConfig::default());
        assert!(config.drafts.is_none());
        assert_eq!(
            config.scanner.endpoint.as_str(),
            DEFAULT_SCANNER_ENDPOINT
        );
        // Missing file, timeout equal to cooldown, missing drafts endpoint.
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn file_values_fill_every_section() {
        let file = parse(
            r#"
            [server]
            port = 9090

            [orchestrator]
            default_concurrency = 8
            target_timeout = "5s"
            auto_enqueue_reviews = false

            [breaker]
            failure_threshold = 3
            cooldown = "1m"

            [retry]
            max_attempts = 4
            initial_backoff = "50ms"

            [scoring.thresholds]
            auto_approve = 0.9

            [review]
            auto_reject = true

            [scanner]
            endpoint = "http://scanner.internal/check"

            [drafts]
            endpoint = "http://drafts.internal/v1/draft"
            timeout = "3s"

            [export]
            dir = "/var/lib/auditgate/exports"
            "#,
        );

        let (config, _) =
            compose(Some(file), EnvConfig::default()).expect("valid config");

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.orchestrator.default_concurrency, 8);
        assert_eq!(config.orchestrator.target_timeout, Duration::from_secs(5));
        assert!(!config.orchestrator.auto_enqueue_reviews);
        assert_eq!(config.orchestrator.retry.max_attempts, 4);
        assert_eq!(
            config.orchestrator.retry.initial_backoff,
            Duration::from_millis(50)
        );
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.breaker.cooldown, Duration::from_secs(60));
        assert_eq!(config.scoring.thresholds.auto_approve, 0.9);
        assert_eq!(config.scoring.thresholds.human_review, 0.5);
        assert!(config.review.auto_reject);
        let drafts = config.drafts.expect("drafts configured");
        assert_eq!(drafts.timeout, Duration::from_secs(3));
        assert_eq!(
            config.export.dir,
            PathBuf::from("/var/lib/auditgate/exports")
        );
    }

    #[test]
    fn environment_overrides_file() {
        let file = parse(
            r#"
            [orchestrator]
            default_concurrency = 8
            "#,
        );
        let env = EnvConfig {
            default_concurrency: Some(2),
            scanner_endpoint: Some("http://env-scanner/check".into()),
            ..EnvConfig::default()
        };

        let (config, _) = compose(Some(file), env).expect("valid config");
        assert_eq!(config.orchestrator.default_concurrency, 2);
        assert_eq!(config.scanner.endpoint.host_str(), Some("env-scanner"));
    }

    #[test]
    fn timeout_must_stay_below_cooldown() {
        let env = EnvConfig {
            target_timeout: Some("45s".into()),
            breaker_cooldown: Some("30s".into()),
            ..EnvConfig::default()
        };

        let err = compose(None, env).expect_err("guard rail trips");
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(
                ConfigGuardRailError::TimeoutExceedsCooldown { .. }
            )
        ));
    }

    #[test]
    fn concurrency_outside_range_is_rejected() {
        let env = EnvConfig {
            default_concurrency: Some(17),
            ..EnvConfig::default()
        };
        let err = compose(None, env).expect_err("guard rail trips");
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(
                ConfigGuardRailError::ConcurrencyOutOfRange { value: 17, .. }
            )
        ));
    }

    #[test]
    fn inverted_and_zero_thresholds_are_rejected() {
        let inverted = parse(
            r#"
            [scoring.thresholds]
            auto_approve = 0.4
            human_review = 0.6
            "#,
        );
        let err = compose(Some(inverted), EnvConfig::default())
            .expect_err("inverted thresholds");
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(
                ConfigGuardRailError::InvertedThresholds { .. }
            )
        ));

        let env = EnvConfig {
            breaker_failure_threshold: Some(0),
            ..EnvConfig::default()
        };
        let err = compose(None, env).expect_err("zero threshold");
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::Zero {
                field: "breaker.failure_threshold"
            })
        ));
    }

    #[test]
    fn unbalanced_weights_only_warn() {
        let file = parse(
            r#"
            [scoring.weights]
            severity = 0.5
            "#,
        );
        let (_, warnings) =
            compose(Some(file), EnvConfig::default()).expect("still valid");
        assert!(
            warnings
                .items
                .iter()
                .any(|w| w.message.contains("weights sum to 1.150"))
        );
    }

    #[test]
    fn bad_duration_names_the_field() {
        let env = EnvConfig {
            breaker_cooldown: Some("soon".into()),
            ..EnvConfig::default()
        };
        let err = compose(None, env).expect_err("unparseable duration");
        assert!(matches!(
            err,
            ConfigLoadError::InvalidDuration {
                field: "breaker.cooldown",
                ..
            }
        ));
    }
}
