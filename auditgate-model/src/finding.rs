use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::ids::JobId;

/// Impact bucket reported by the accessibility checker.
///
/// Ordered from least to most severe so `Ord` comparisons read naturally.
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
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Serious => "serious",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw accessibility defect reported for one target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Success-criterion or rule code, e.g. `1.1.1` or `color-contrast`.
    pub criterion_id: String,
    pub severity: Severity,
    /// Free text or CSS selector locating the defect.
    pub evidence: String,
    pub detection_confidence: f64,
}

impl Finding {
    pub fn new(
        criterion_id: impl Into<String>,
        severity: Severity,
        evidence: impl Into<String>,
        detection_confidence: f64,
    ) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            severity,
            evidence: evidence.into(),
            detection_confidence: clamp_confidence(detection_confidence),
        }
    }

    /// Returns a copy with the confidence forced into `[0, 1]`. Checkers are
    /// external, so values are normalized on ingestion rather than trusted.
    pub fn normalized(mut self) -> Self {
        self.detection_confidence =
            clamp_confidence(self.detection_confidence);
        self
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Back-reference from a review record to the finding it was created for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingRef {
    pub job_id: JobId,
    pub target: Url,
    pub index: usize,
    pub criterion_id: String,
}

impl fmt::Display for FindingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}#{}:{}",
            self.job_id, self.target, self.index, self.criterion_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped_on_construction() {
        let high = Finding::new("1.1.1", Severity::Minor, "img", 1.7);
        let low = Finding::new("1.1.1", Severity::Minor, "img", -0.3);
        let nan = Finding::new("1.1.1", Severity::Minor, "img", f64::NAN);

        assert_eq!(high.detection_confidence, 1.0);
        assert_eq!(low.detection_confidence, 0.0);
        assert_eq!(nan.detection_confidence, 0.0);
    }

    #[test]
    fn severity_orders_by_impact() {
        assert!(Severity::Critical > Severity::Serious);
        assert!(Severity::Serious > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
    }

    #[test]
    fn severity_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
