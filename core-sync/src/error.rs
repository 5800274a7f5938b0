use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Playlist bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Pair handler failed for {key}: {message}")]
    Handler { key: String, message: String },

    #[error("Match source error: {0}")]
    MatchSource(String),

    #[error("Invalid correlation key: {0}")]
    InvalidKey(String),

    #[error("Duplicate playlist item {0} in local snapshot")]
    DuplicateItem(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
