pub mod config;
pub mod engine;

pub use config::{
    DecisionThresholds, FactorWeights, IndustryRisk, ScoringConfig,
    SeverityWeights, TierThresholds,
};
pub use engine::{NO_FINDINGS_REASON, ScoringEngine, compare_findings};
