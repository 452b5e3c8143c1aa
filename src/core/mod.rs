//! Core application modules: configuration, errors, logging, metrics and retries

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod metrics_server;
pub mod retry;
pub mod utils;

pub use config::{ArchiveMode, ArchiveTarget, ConfigError, Settings};
pub use error::AppError;
pub use logging::{init_logger, log_startup_configuration};
