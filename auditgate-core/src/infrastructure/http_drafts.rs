use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::{
    error::{AuditError, Result},
    remediation::{DraftRequest, DraftService},
};

#[derive(Deserialize)]
struct DraftResponse {
    text: String,
}

/// `POST {endpoint}` with the finding context, answered by `{text}`.
#[derive(Clone, Debug)]
pub struct HttpDraftService {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpDraftService {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("auditgate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl DraftService for HttpDraftService {
    async fn draft(&self, request: &DraftRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| {
                AuditError::DraftFailed(format!("draft request: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::DraftFailed(format!(
                "draft service answered HTTP {status}"
            )));
        }

        let body: DraftResponse = response.json().await.map_err(|err| {
            AuditError::DraftFailed(format!("unreadable draft response: {err}"))
        })?;
        Ok(body.text)
    }
}
