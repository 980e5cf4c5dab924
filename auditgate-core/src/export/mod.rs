//! Rendering approved findings into a client deliverable.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use auditgate_model::{Finding, FindingRef, RecordId, ReviewRecord, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AuditError, Result};

/// One approved finding as it appears in a report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportItem {
    pub record_id: RecordId,
    pub finding_ref: FindingRef,
    pub finding: Finding,
    pub score: f64,
    pub tier: Tier,
    pub reasoning: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl From<&ReviewRecord> for ExportItem {
    fn from(record: &ReviewRecord) -> Self {
        Self {
            record_id: record.id,
            finding_ref: record.finding_ref.clone(),
            finding: record.finding.clone(),
            score: record.score.score,
            tier: record.score.tier,
            reasoning: record.score.reasoning.clone(),
            reviewer_id: record.reviewer_id.clone(),
            decided_at: record.decided_at,
            notes: record.notes.clone(),
            suggested_fix: record.suggested_fix.clone(),
        }
    }
}

/// Opaque locator of a rendered artifact (a path, object key or URL).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait ReportExporter: Send + Sync {
    async fn export(&self, items: &[ExportItem]) -> Result<ArtifactRef>;
}

/// A record that was collected for export but could not be marked exported
/// afterwards, typically because it changed state in the meantime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub record_id: RecordId,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportReceipt {
    pub artifact: ArtifactRef,
    pub exported: Vec<RecordId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report_id: Uuid,
    generated_at: DateTime<Utc>,
    item_count: usize,
    items: &'a [ExportItem],
}

/// Writes each export as a pretty-printed JSON document under a directory.
#[derive(Clone, Debug)]
pub struct JsonReportExporter {
    dir: PathBuf,
}

impl JsonReportExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReportExporter for JsonReportExporter {
    async fn export(&self, items: &[ExportItem]) -> Result<ArtifactRef> {
        if items.is_empty() {
            return Err(AuditError::Export("nothing to export".into()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let report = JsonReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            item_count: items.len(),
            items,
        };
        let body = serde_json::to_vec_pretty(&report)?;
        let path = self.dir.join(format!("{}.json", report.report_id));
        tokio::fs::write(&path, body).await?;

        info!(
            path = %path.display(),
            items = items.len(),
            "wrote review export"
        );
        Ok(ArtifactRef(path.display().to_string()))
    }
}
