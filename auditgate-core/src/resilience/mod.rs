//! Guards around unreliable external dependencies: per-dependency circuit
//! breakers, the registry that shares them process-wide, and the retry
//! combinator callers wrap around them.

pub mod breaker;
pub mod registry;
pub mod retry;

pub use breaker::*;
pub use registry::*;
pub use retry::*;
