//! Telemetry errors.

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while configuring logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or installation failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Error reported by `tracing-subscriber`.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// The log format label is not one of `json`, `pretty`, `text` or `auto`.
    #[error("unknown log format '{value}'")]
    UnknownFormat {
        /// Label as supplied.
        value: String,
    },
}
