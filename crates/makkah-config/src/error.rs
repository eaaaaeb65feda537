//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A field needed by the requested operation is not configured.
    #[error("missing configuration field")]
    MissingField {
        /// Section holding the field.
        section: &'static str,
        /// Name of the missing field.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// Configuration document could not be parsed.
    #[error("failed to parse configuration document")]
    Parse {
        /// Path of the document.
        path: PathBuf,
        /// Source parse error.
        source: serde_json::Error,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the operation.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}

impl ConfigError {
    /// One-line description including the context fields, for CLI output.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidField {
                section,
                field,
                value,
                reason,
            } => match value {
                Some(value) => format!("{section}.{field} = '{value}' is invalid: {reason}"),
                None => format!("{section}.{field} is invalid: {reason}"),
            },
            Self::MissingField {
                section,
                field,
                env,
            } => format!("{section}.{field} is not configured (set {env})"),
            Self::Parse { path, source } => {
                format!("failed to parse {}: {source}", path.display())
            }
            Self::Io {
                operation,
                path,
                source,
            } => format!("{operation} failed for {}: {source}", path.display()),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_includes_context() {
        let err = ConfigError::MissingField {
            section: "media",
            field: "cloud_name",
            env: "MAKKAH_CLOUDINARY_CLOUD_NAME",
        };
        assert_eq!(err.to_string(), "missing configuration field");
        assert_eq!(
            err.detail(),
            "media.cloud_name is not configured (set MAKKAH_CLOUDINARY_CLOUD_NAME)"
        );
    }
}
