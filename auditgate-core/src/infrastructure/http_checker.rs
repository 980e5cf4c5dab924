use std::time::Duration;

use async_trait::async_trait;
use auditgate_model::Finding;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{AuditError, Result},
    orchestration::AccessibilityChecker,
};

#[derive(Serialize)]
struct CheckRequest<'a> {
    url: &'a Url,
    timeout_ms: u64,
}

#[derive(Deserialize)]
struct CheckResponse {
    #[serde(default)]
    findings: Vec<Finding>,
}

/// Talks to a remote scanner over JSON: `POST {endpoint}` with
/// `{url, timeout_ms}`, answered by `{findings: [...]}`.
#[derive(Clone, Debug)]
pub struct HttpAccessibilityChecker {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpAccessibilityChecker {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("auditgate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AccessibilityChecker for HttpAccessibilityChecker {
    async fn check(
        &self,
        target: &Url,
        timeout: Duration,
    ) -> Result<Vec<Finding>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(timeout)
            .json(&CheckRequest {
                url: target,
                timeout_ms: timeout.as_millis() as u64,
            })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AuditError::Timeout {
                        dependency: crate::resilience::DOM_SCANNER.into(),
                        after: timeout,
                    }
                } else {
                    AuditError::CheckFailed(format!("scanner request: {err}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::CheckFailed(format!(
                "scanner answered HTTP {status} for {target}"
            )));
        }

        let body: CheckResponse = response.json().await.map_err(|err| {
            AuditError::CheckFailed(format!("unreadable scanner response: {err}"))
        })?;
        Ok(body.findings.into_iter().map(Finding::normalized).collect())
    }
}
