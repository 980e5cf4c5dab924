use auditgate_model::{Industry, Severity};
use serde::{Deserialize, Serialize};

/// Every weight and threshold the scoring engine uses.
///
/// All fields carry defaults so a configuration file only needs to name the
/// values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Relative weight of each sub-score in the final total.
    pub weights: FactorWeights,
    /// Per-severity contribution to the severity sub-score.
    pub severity_weights: SeverityWeights,
    pub thresholds: DecisionThresholds,
    pub tiers: TierThresholds,
    /// Finding count at which the volume sub-score saturates at 1.0.
    pub volume_saturation: f64,
    /// Confidence variance at which the disagreement penalty is at its
    /// maximum.
    pub variance_ceiling: f64,
    pub max_disagreement_penalty: f64,
    /// A critical finding at or above this confidence lifts the score to the
    /// auto-approve threshold. `None` disables the floor.
    pub critical_confidence_floor: Option<f64>,
    pub industry_risk: IndustryRisk,
    /// Share of industry risk vs. prior history inside the context sub-score.
    pub industry_share: f64,
    /// How many individual findings are cited in the reasoning.
    pub max_reasoning_findings: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            severity_weights: SeverityWeights::default(),
            thresholds: DecisionThresholds::default(),
            tiers: TierThresholds::default(),
            volume_saturation: 30.0,
            variance_ceiling: 0.0625,
            max_disagreement_penalty: 0.2,
            critical_confidence_floor: Some(0.9),
            industry_risk: IndustryRisk::default(),
            industry_share: 0.7,
            max_reasoning_findings: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub severity: f64,
    pub confidence: f64,
    pub volume: f64,
    pub context: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            severity: 0.35,
            confidence: 0.35,
            volume: 0.20,
            context: 0.10,
        }
    }
}

impl FactorWeights {
    pub fn sum(&self) -> f64 {
        self.severity + self.confidence + self.volume + self.context
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub critical: f64,
    pub serious: f64,
    pub moderate: f64,
    pub minor: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 1.0,
            serious: 0.7,
            moderate: 0.4,
            minor: 0.15,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Serious => self.serious,
            Severity::Moderate => self.moderate,
            Severity::Minor => self.minor,
        }
    }
}

/// `score >= auto_approve` approves, `score >= human_review` escalates,
/// anything lower is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    pub auto_approve: f64,
    pub human_review: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 0.85,
            human_review: 0.50,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub tier_one: f64,
    pub tier_two: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            tier_one: 0.85,
            tier_two: 0.6,
        }
    }
}

/// Baseline risk per industry vertical, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryRisk {
    pub healthcare: f64,
    pub insurance: f64,
    pub finance: f64,
    pub government: f64,
    pub education: f64,
    pub retail: f64,
    pub other: f64,
}

impl Default for IndustryRisk {
    fn default() -> Self {
        Self {
            healthcare: 1.0,
            insurance: 0.9,
            finance: 0.9,
            government: 1.0,
            education: 0.8,
            retail: 0.4,
            other: 0.2,
        }
    }
}

impl IndustryRisk {
    pub fn risk(&self, industry: Industry) -> f64 {
        match industry {
            Industry::Healthcare => self.healthcare,
            Industry::Insurance => self.insurance,
            Industry::Finance => self.finance,
            Industry::Government => self.government,
            Industry::Education => self.education,
            Industry::Retail => self.retail,
            Industry::Other => self.other,
        }
    }
}
