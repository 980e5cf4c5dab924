//! Configuration library for auditgate.
//!
//! Settings come from an optional TOML file, a `.env` file and the process
//! environment, in increasing order of precedence. The loader turns them
//! into the core crate's tuning structs and runs guard rails over the result
//! so a misconfigured deployment fails at startup instead of mid-audit.

#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    Config, ConfigMetadata, DraftsConfig, ExportConfig, ScannerConfig,
    ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
