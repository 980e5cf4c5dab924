pub mod audit_log;
pub mod workflow;

pub use audit_log::{AuditLog, InMemoryAuditLog, NewAuditEntry};
pub use workflow::{
    Decision, ExportFilter, ReviewConfig, ReviewSubmission, ReviewWorkflow,
    SYSTEM_ACTOR,
};
