use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModelError;

/// Priority bucket used to order human review queues. `Tier::One` is the most
/// urgent. Serialized as the bare number.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Tier {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Tier {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Tier {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::One),
            2 => Ok(Tier::Two),
            3 => Ok(Tier::Three),
            other => Err(ModelError::InvalidTier(other)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(value: Tier) -> Self {
        value.as_u8()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.as_u8())
    }
}

/// Automated disposition suggested by the scoring engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecommendedAction {
    AutoApprove,
    HumanReview,
    Reject,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendedAction::AutoApprove => write!(f, "autoApprove"),
            RecommendedAction::HumanReview => write!(f, "humanReview"),
            RecommendedAction::Reject => write!(f, "reject"),
        }
    }
}

/// The four factor scores that feed the weighted total, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub severity: f64,
    pub confidence: f64,
    pub volume: f64,
    pub context: f64,
}

/// Explainable result of scoring one target's findings. Never edited in
/// place; rescoring produces a new value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: f64,
    pub tier: Tier,
    pub recommended_action: RecommendedAction,
    pub reasoning: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

/// Industry vertical of the audited site. Regulated verticals carry higher
/// contextual risk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Healthcare,
    Insurance,
    Finance,
    Government,
    Education,
    Retail,
    Other,
}

impl Industry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Healthcare => "healthcare",
            Industry::Insurance => "insurance",
            Industry::Finance => "finance",
            Industry::Government => "government",
            Industry::Education => "education",
            Industry::Retail => "retail",
            Industry::Other => "other",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional signals outside the findings themselves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    /// Share of previous audits for this client that ended with confirmed
    /// violations, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_violation_rate: Option<f64>,
}

impl ScoringContext {
    pub fn is_empty(&self) -> bool {
        self.industry.is_none() && self.prior_violation_rate.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_round_trips_as_number() {
        let json = serde_json::to_string(&Tier::Two).unwrap();
        assert_eq!(json, "2");
        let parsed: Tier = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Tier::One);
    }

    #[test]
    fn tier_rejects_out_of_range() {
        assert_eq!(Tier::try_from(4), Err(ModelError::InvalidTier(4)));
        assert!(serde_json::from_str::<Tier>("0").is_err());
    }

    #[test]
    fn recommended_action_uses_camel_case() {
        let json =
            serde_json::to_string(&RecommendedAction::AutoApprove).unwrap();
        assert_eq!(json, "\"autoApprove\"");
    }
}
