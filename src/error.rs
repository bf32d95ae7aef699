//! Error types for the monitoring pipeline

use thiserror::Error;

/// Failure to read the trader/session collaborator
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Balance unavailable: {0}")]
    Balance(String),

    #[error("Positions unavailable: {0}")]
    Positions(String),

    #[error("Session stats unavailable: {0}")]
    Stats(String),

    #[error("Session state file error: {0}")]
    StateFile(String),
}

/// Snapshot construction failed as a whole
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Trader state unreadable: {0}")]
    Session(#[from] SessionError),

    #[error("Invalid configuration for snapshot: {0}")]
    Config(String),

    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),
}

/// A single rendering tier failed
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Value is not representable in a chart: {0}")]
    NonFinite(String),

    #[error("Chart image is {size} bytes (limit {limit})")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("Renderer produced no output")]
    Empty,

    #[error("Chart backend failed: {0}")]
    Backend(String),
}

/// Configuration could not be loaded or is invalid
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
