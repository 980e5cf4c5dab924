use std::time::Duration;

use auditgate_core::orchestration::MAX_CONCURRENCY_LIMIT;
use thiserror::Error;

use super::models::Config;

/// Weight sums further than this from 1.0 produce a warning.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error(
        "target timeout {timeout:?} must not exceed the breaker cooldown {cooldown:?}"
    )]
    TimeoutExceedsCooldown { timeout: Duration, cooldown: Duration },
    #[error("default concurrency {value} must be within 1..={max}")]
    ConcurrencyOutOfRange { value: usize, max: usize },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{lower} ({lower_value}) must not exceed {upper} ({upper_value})")]
    InvertedThresholds {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    let orchestrator = &config.orchestrator;
    if orchestrator.target_timeout > config.breaker.cooldown {
        return Err(ConfigGuardRailError::TimeoutExceedsCooldown {
            timeout: orchestrator.target_timeout,
            cooldown: config.breaker.cooldown,
        });
    }
    if orchestrator.target_timeout == config.breaker.cooldown {
        warnings.push_with_hint(
            format!(
                "orchestrator.target_timeout equals breaker.cooldown ({:?})",
                config.breaker.cooldown
            ),
            "Lower the target timeout so a probe never waits out a whole cooldown",
        );
    }
    if !(1..=MAX_CONCURRENCY_LIMIT).contains(&orchestrator.default_concurrency)
    {
        return Err(ConfigGuardRailError::ConcurrencyOutOfRange {
            value: orchestrator.default_concurrency,
            max: MAX_CONCURRENCY_LIMIT,
        });
    }
    if orchestrator.event_channel_capacity == 0 {
        return Err(ConfigGuardRailError::Zero {
            field: "orchestrator.event_channel_capacity",
        });
    }
    if orchestrator.target_timeout.is_zero() {
        return Err(ConfigGuardRailError::Zero {
            field: "orchestrator.target_timeout",
        });
    }

    if config.breaker.failure_threshold == 0 {
        return Err(ConfigGuardRailError::Zero {
            field: "breaker.failure_threshold",
        });
    }
    if config.breaker.success_threshold == 0 {
        return Err(ConfigGuardRailError::Zero {
            field: "breaker.success_threshold",
        });
    }

    let retry = &orchestrator.retry;
    if retry.max_attempts == 0 {
        warnings.push_with_hint(
            "retry.max_attempts is 0; every call gets a single attempt",
            "Set retry.max_attempts to 1 to make the single attempt explicit",
        );
    }
    if retry.initial_backoff > retry.max_backoff {
        warnings.push(format!(
            "retry.initial_backoff {:?} exceeds retry.max_backoff {:?}; every wait is capped",
            retry.initial_backoff, retry.max_backoff
        ));
    }

    check_scoring(config, &mut warnings)?;

    if config.drafts.is_none() {
        warnings.push_with_hint(
            "No drafts endpoint configured; findings are reviewed without suggested fixes",
            "Set AUDITGATE_DRAFTS_URL or add a [drafts] section to enable remediation drafts",
        );
    }

    Ok(warnings)
}

fn check_scoring(
    config: &Config,
    warnings: &mut ConfigWarnings,
) -> Result<(), ConfigGuardRailError> {
    let scoring = &config.scoring;

    let thresholds = &scoring.thresholds;
    unit("scoring.thresholds.auto_approve", thresholds.auto_approve)?;
    unit("scoring.thresholds.human_review", thresholds.human_review)?;
    if thresholds.auto_approve <= 0.0 {
        return Err(ConfigGuardRailError::Zero {
            field: "scoring.thresholds.auto_approve",
        });
    }
    if thresholds.human_review > thresholds.auto_approve {
        return Err(ConfigGuardRailError::InvertedThresholds {
            lower: "scoring.thresholds.human_review",
            lower_value: thresholds.human_review,
            upper: "scoring.thresholds.auto_approve",
            upper_value: thresholds.auto_approve,
        });
    }

    let tiers = &scoring.tiers;
    unit("scoring.tiers.tier_one", tiers.tier_one)?;
    unit("scoring.tiers.tier_two", tiers.tier_two)?;
    if tiers.tier_two > tiers.tier_one {
        return Err(ConfigGuardRailError::InvertedThresholds {
            lower: "scoring.tiers.tier_two",
            lower_value: tiers.tier_two,
            upper: "scoring.tiers.tier_one",
            upper_value: tiers.tier_one,
        });
    }

    unit("scoring.industry_share", scoring.industry_share)?;
    if let Some(floor) = scoring.critical_confidence_floor {
        unit("scoring.critical_confidence_floor", floor)?;
    }

    let sum = scoring.weights.sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        warnings.push_with_hint(
            format!("scoring weights sum to {sum:.3}, not 1.0"),
            "Adjust scoring.weights so severity, confidence, volume and context add up to 1.0",
        );
    }

    Ok(())
}

fn unit(field: &'static str, value: f64) -> Result<(), ConfigGuardRailError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigGuardRailError::OutOfUnitRange { field, value })
    }
}
