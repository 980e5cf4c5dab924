use std::{fmt, sync::Arc};

use auditgate_core::{
    BatchAuditService, BreakerRegistry, ReportExporter, ReviewWorkflow,
};

/// Everything the handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub audits: BatchAuditService,
    pub reviews: ReviewWorkflow,
    pub breakers: BreakerRegistry,
    pub exporter: Arc<dyn ReportExporter>,
    /// Empty or containing `*` allows any origin.
    pub cors_allowed_origins: Arc<[String]>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        audits: BatchAuditService,
        reviews: ReviewWorkflow,
        exporter: Arc<dyn ReportExporter>,
    ) -> Self {
        let breakers = audits.breakers().clone();
        Self {
            audits,
            reviews,
            breakers,
            exporter,
            cors_allowed_origins: Arc::from(Vec::new()),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_allowed_origins = Arc::from(origins);
        self
    }
}
