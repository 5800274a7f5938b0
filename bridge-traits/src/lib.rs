//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host.
//!
//! ## Overview
//!
//! This crate defines the contract between the reconciliation core and the
//! host that owns the local playlist. Each trait represents a capability the
//! core requires but that lives outside of it.
//!
//! ## Traits
//!
//! ### Playlist
//! - [`PlaylistBackend`](playlist::PlaylistBackend) - Current order snapshot and the
//!   "move item after reference item" primitive
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. The core
//! treats any `BridgeError` as a collaborator fault: it is never retried and it
//! propagates to the caller. Implementations should:
//!
//! - Convert host-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include the offending playlist item handle where one exists
//!
//! ## Thread Safety
//!
//! Bridge traits require [`PlatformSendSync`](platform::PlatformSendSync) so
//! implementations can be shared behind `Arc` on native targets.

pub mod error;
pub mod platform;
pub mod playlist;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use playlist::{InMemoryPlaylist, LocalItem, PlaylistBackend, PlaylistItemId};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
