//! HTTP adapters for the external scanner and draft service ports.

pub mod http_checker;
pub mod http_drafts;

pub use http_checker::HttpAccessibilityChecker;
pub use http_drafts::HttpDraftService;
