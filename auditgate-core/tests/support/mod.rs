#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use auditgate_core::{
    AccessibilityChecker, AuditError, DraftRequest, DraftService, Finding,
    Result, Severity,
};
use url::Url;

/// What the scripted checker does for one host.
#[derive(Clone, Debug)]
pub enum Behavior {
    Findings(Vec<Finding>),
    Fail,
    Sleep(Duration),
}

/// Checker whose answer depends on the target's host. Unknown hosts report
/// no findings.
#[derive(Debug, Default)]
pub struct ScriptedChecker {
    behaviors: HashMap<String, Behavior>,
    calls: parking_lot::Mutex<HashMap<String, usize>>,
    total_calls: AtomicUsize,
}

impl ScriptedChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, host: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(host.to_string(), behavior);
        self
    }

    pub fn calls_for(&self, host: &str) -> usize {
        self.calls.lock().get(host).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessibilityChecker for ScriptedChecker {
    async fn check(
        &self,
        target: &Url,
        _timeout: Duration,
    ) -> Result<Vec<Finding>> {
        let host = target.host_str().unwrap_or_default().to_string();
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().entry(host.clone()).or_default() += 1;

        match self.behaviors.get(&host).cloned() {
            Some(Behavior::Findings(findings)) => Ok(findings),
            Some(Behavior::Fail) => {
                Err(AuditError::CheckFailed(format!("{host} crashed the scanner")))
            }
            Some(Behavior::Sleep(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Draft service answering with a fixed text.
#[derive(Debug)]
pub struct CannedDrafts(pub &'static str);

#[async_trait]
impl DraftService for CannedDrafts {
    async fn draft(&self, request: &DraftRequest) -> Result<String> {
        Ok(format!("{} ({})", self.0, request.criterion_id))
    }
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).expect("valid test url")
}

/// Forty findings of mixed severity including two critical ones.
pub fn mixed_findings() -> Vec<Finding> {
    let severities = [
        Severity::Critical,
        Severity::Serious,
        Severity::Moderate,
        Severity::Minor,
    ];
    (0..40)
        .map(|i| {
            let severity = if i < 2 {
                Severity::Critical
            } else {
                severities[i % severities.len()]
            };
            Finding::new(
                format!("rule-{i:02}"),
                severity,
                format!("#node-{i}"),
                0.6 + (i % 4) as f64 * 0.1,
            )
        })
        .collect()
}
