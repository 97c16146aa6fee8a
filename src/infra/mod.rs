//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, calibration persistence)
//! - `metrics` - Lock-free counters and periodic summary reporting

pub mod config;
pub mod metrics;

pub use config::Config;
pub use metrics::Metrics;
