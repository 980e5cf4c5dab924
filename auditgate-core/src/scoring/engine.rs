//! Reduces one target's raw findings to a bounded, explainable score.
//!
//! Everything here is pure: the same findings, context and configuration
//! always produce the same `ScoreOutcome`, including the reasoning lines.

use std::cmp::Ordering;

use auditgate_model::{
    Finding, RecommendedAction, ScoreBreakdown, ScoreOutcome, ScoringContext,
    Severity, Tier,
};

use super::config::ScoringConfig;

pub const NO_FINDINGS_REASON: &str = "no findings detected";

#[derive(Clone, Debug, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(
        &self,
        findings: &[Finding],
        context: Option<&ScoringContext>,
    ) -> ScoreOutcome {
        if findings.is_empty() {
            return ScoreOutcome {
                score: 0.0,
                tier: Tier::Three,
                recommended_action: RecommendedAction::AutoApprove,
                reasoning: vec![NO_FINDINGS_REASON.to_string()],
                breakdown: ScoreBreakdown::default(),
            };
        }

        let mut ordered: Vec<Finding> =
            findings.iter().cloned().map(Finding::normalized).collect();
        ordered.sort_by(compare_findings);

        let breakdown = ScoreBreakdown {
            severity: self.severity_score(&ordered),
            confidence: self.confidence_score(&ordered),
            volume: self.volume_score(ordered.len()),
            context: self.context_score(context),
        };

        let weights = &self.config.weights;
        let weighted = clamp01(
            weights.severity * breakdown.severity
                + weights.confidence * breakdown.confidence
                + weights.volume * breakdown.volume
                + weights.context * breakdown.context,
        );

        let mut reasoning = vec![
            format!(
                "severity {:.3} (mean weight of {} finding(s))",
                breakdown.severity,
                ordered.len()
            ),
            format!(
                "confidence {:.3} (mean detection confidence less disagreement penalty)",
                breakdown.confidence
            ),
            format!(
                "volume {:.3} ({} of {} finding(s) to saturate)",
                breakdown.volume,
                ordered.len(),
                self.config.volume_saturation
            ),
            format!("context {:.3}", breakdown.context),
            format!("weighted score {weighted:.3}"),
        ];

        let mut score = weighted;
        if let Some(floor) = self.critical_floor(&ordered)
            && score < floor.threshold
        {
            score = floor.threshold;
            reasoning.push(format!(
                "critical finding {} at confidence {:.2} lifts score to {:.3}",
                floor.criterion_id, floor.confidence, floor.threshold
            ));
        }

        let has_critical =
            ordered.iter().any(|f| f.severity == Severity::Critical);
        let recommended_action = self.action_for(score);
        let tier = self.tier_for(score, has_critical);

        reasoning.push(format!(
            "score {score:.3} recommends {recommended_action}"
        ));
        reasoning.push(if has_critical {
            format!("{tier}: at least one critical finding")
        } else {
            format!("{tier} from score {score:.3}")
        });

        let cited = self.config.max_reasoning_findings.min(ordered.len());
        reasoning.extend(ordered.iter().take(cited).map(|finding| {
            format!(
                "{} {} (confidence {:.2}): {}",
                finding.severity,
                finding.criterion_id,
                finding.detection_confidence,
                finding.evidence
            )
        }));
        if ordered.len() > cited {
            reasoning.push(format!(
                "... and {} more finding(s)",
                ordered.len() - cited
            ));
        }

        ScoreOutcome {
            score,
            tier,
            recommended_action,
            reasoning,
            breakdown,
        }
    }

    pub fn action_for(&self, score: f64) -> RecommendedAction {
        let thresholds = &self.config.thresholds;
        if score >= thresholds.auto_approve {
            RecommendedAction::AutoApprove
        } else if score >= thresholds.human_review {
            RecommendedAction::HumanReview
        } else {
            RecommendedAction::Reject
        }
    }

    pub fn tier_for(&self, score: f64, has_critical: bool) -> Tier {
        let tiers = &self.config.tiers;
        if has_critical || score >= tiers.tier_one {
            Tier::One
        } else if score >= tiers.tier_two {
            Tier::Two
        } else {
            Tier::Three
        }
    }

    fn severity_score(&self, findings: &[Finding]) -> f64 {
        let total: f64 = findings
            .iter()
            .map(|f| clamp01(self.config.severity_weights.weight(f.severity)))
            .sum();
        clamp01(total / findings.len() as f64)
    }

    fn confidence_score(&self, findings: &[Finding]) -> f64 {
        let n = findings.len() as f64;
        let mean =
            findings.iter().map(|f| f.detection_confidence).sum::<f64>() / n;
        let variance = findings
            .iter()
            .map(|f| (f.detection_confidence - mean).powi(2))
            .sum::<f64>()
            / n;

        let ceiling = self.config.variance_ceiling;
        let saturation = if ceiling > 0.0 {
            (variance / ceiling).min(1.0)
        } else if variance > 0.0 {
            1.0
        } else {
            0.0
        };
        let penalty = clamp01(self.config.max_disagreement_penalty) * saturation;

        clamp01(mean - penalty)
    }

    fn volume_score(&self, count: usize) -> f64 {
        let saturation = self.config.volume_saturation;
        if saturation <= 0.0 {
            return 1.0;
        }
        (count as f64 / saturation).min(1.0)
    }

    fn context_score(&self, context: Option<&ScoringContext>) -> f64 {
        let Some(context) = context else {
            return 0.0;
        };
        let share = clamp01(self.config.industry_share);
        let industry = context
            .industry
            .map(|industry| clamp01(self.config.industry_risk.risk(industry)))
            .unwrap_or(0.0);
        let history = context.prior_violation_rate.map(clamp01).unwrap_or(0.0);

        clamp01(share * industry + (1.0 - share) * history)
    }

    fn critical_floor<'a>(
        &self,
        ordered: &'a [Finding],
    ) -> Option<CriticalFloor<'a>> {
        let floor = self.config.critical_confidence_floor?;
        // Ordering puts the most confident critical finding first.
        let finding = ordered.first().filter(|f| {
            f.severity == Severity::Critical && f.detection_confidence >= floor
        })?;
        Some(CriticalFloor {
            criterion_id: &finding.criterion_id,
            confidence: finding.detection_confidence,
            threshold: clamp01(self.config.thresholds.auto_approve),
        })
    }
}

struct CriticalFloor<'a> {
    criterion_id: &'a str,
    confidence: f64,
    threshold: f64,
}

/// Severity descending, then confidence descending, then criterion id.
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.detection_confidence.total_cmp(&a.detection_confidence))
        .then_with(|| a.criterion_id.cmp(&b.criterion_id))
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
