//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playlist reconciliation core:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the sync crate depends on. It
//! establishes the logging conventions and the fail-fast configuration
//! builder used to wire host bridges into a reconciliation pass.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
