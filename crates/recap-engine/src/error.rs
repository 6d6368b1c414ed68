//! Engine error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Event feed error: {0}")]
    EventFeed(String),

    #[error("Manifest build failed: {0}")]
    BuildFailed(String),
}

impl EngineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn event_feed(msg: impl Into<String>) -> Self {
        Self::EventFeed(msg.into())
    }

    pub fn build_failed(msg: impl Into<String>) -> Self {
        Self::BuildFailed(msg.into())
    }
}
