pub mod checker;
pub mod config;
pub mod event_bus;
pub mod events;
pub mod service;
pub mod store;

pub use checker::AccessibilityChecker;
pub use config::{MAX_CONCURRENCY_LIMIT, OrchestratorConfig};
pub use event_bus::InProcJobEventBus;
pub use events::{JobEvent, JobEventPayload, JobEventPublisher};
pub use service::{
    BatchAuditService, BatchAuditServiceBuilder, CANCELLED_REASON, ReviewFeed,
    parse_targets,
};
pub use store::{InMemoryJobStore, JobStore};
