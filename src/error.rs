//! Error types for the clustering engine.

use thiserror::Error;

/// Errors produced by the clustering engine.
///
/// Normal clustering inputs never fail: an empty or invalid viewport yields an
/// empty snapshot, a non-positive cell size disables clustering, and removing
/// a non-member annotation is a no-op. Errors are reserved for misuse of the
/// controller lifecycle and for configuration parsing.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The controller has been closed and no longer accepts operations.
    #[error("cluster controller is closed")]
    ControllerClosed,

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An unknown strategy name was requested from a registry.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// Result type for mapcluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
