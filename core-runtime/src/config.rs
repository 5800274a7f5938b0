//! # Core Configuration Module
//!
//! Provides configuration management for the playlist reconciliation core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and settings a reconciliation pass
//! needs. It enforces fail-fast validation so a missing bridge is reported
//! before the first pass runs rather than half-way through one.
//!
//! ## Required Dependencies
//!
//! - `PlaylistBackend` - Current order snapshot and relocate primitive
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Report timestamps (default: `SystemClock`)
//! - `LoggerSink` - Mirror log events into the host logger
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .playlist_backend(Arc::new(MyPlexPlaylist::new(playlist_id)))
//!     .dry_run(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required dependencies and provides actionable error
//! messages when capabilities are missing:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // This will panic with an actionable error message
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing playlist backend");
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::{Clock, LoggerSink, PlaylistBackend, SystemClock};
use std::sync::Arc;

/// Core configuration for the playlist reconciliation core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Host playlist bridge (required)
    pub playlist_backend: Arc<dyn PlaylistBackend>,

    /// Time source for report timestamps
    pub clock: Arc<dyn Clock>,

    /// Optional sink mirroring log events to the host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Logging setup used by [`init_logging`](crate::logging::init_logging)
    pub logging: LoggingConfig,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("playlist_backend", &"PlaylistBackend { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("logging_format", &self.logging.format)
            .field("logging_level", &self.logging.level)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional behaviour of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Compute relocations without issuing them to the backend
    pub dry_run: bool,

    /// Log the full match table at debug level before each phase
    pub log_match_table: bool,

    /// Let absent local leaves consume a target slot in the sort phase
    pub reserve_absent_slots: bool,

    /// Hand only pairs without a local leaf to the update handler
    pub update_unmatched_only: bool,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - A custom log filter, when given, is not blank
    /// - A logger sink is present when the logging config asks to forward to one
    pub fn validate(&self) -> Result<()> {
        if let Some(filter) = &self.logging.filter {
            if filter.trim().is_empty() {
                return Err(Error::Config(
                    "Log filter cannot be empty. Omit it to use the default filter.".to_string(),
                ));
            }
        }

        if self.logging.logger_sink.is_some() && self.logger_sink.is_none() {
            return Err(Error::Config(
                "Logging config forwards to a LoggerSink but none was registered. \
                 Use .logger_sink() instead of setting the sink on LoggingConfig directly."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn playlist_backend_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlaylistBackend".to_string(),
        message: "PlaylistBackend implementation is required to read the local order \
                 and relocate items. Inject the host playlist adapter, or \
                 bridge_traits::InMemoryPlaylist for dry runs."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    playlist_backend: Option<Arc<dyn PlaylistBackend>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    logging: Option<LoggingConfig>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the host playlist bridge.
    pub fn playlist_backend(mut self, backend: Arc<dyn PlaylistBackend>) -> Self {
        self.playlist_backend = Some(backend);
        self
    }

    /// Sets the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Registers a logger sink; it is also wired into the logging config.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Compute relocations without issuing them.
    pub fn dry_run(mut self, enable: bool) -> Self {
        self.features.dry_run = enable;
        self
    }

    /// Log the match table before each phase.
    pub fn log_match_table(mut self, enable: bool) -> Self {
        self.features.log_match_table = enable;
        self
    }

    /// Let absent local leaves consume a target slot.
    pub fn reserve_absent_slots(mut self, enable: bool) -> Self {
        self.features.reserve_absent_slots = enable;
        self
    }

    /// Restrict the update phase to pairs without a local leaf.
    pub fn update_unmatched_only(mut self, enable: bool) -> Self {
        self.features.update_unmatched_only = enable;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `PlaylistBackend` was provided
    /// - [`Error::Config`] when validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let playlist_backend = self
            .playlist_backend
            .ok_or_else(playlist_backend_missing_error)?;

        let mut logging = self.logging.unwrap_or_default();
        if let Some(sink) = &self.logger_sink {
            logging = logging.with_logger_sink(Arc::clone(sink));
        }

        let config = CoreConfig {
            playlist_backend,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            logging,
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
