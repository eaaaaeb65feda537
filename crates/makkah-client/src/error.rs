//! # Design
//!
//! - Keep error messages constant while carrying context fields for debugging.
//! - Banner and alert wording lives in `user_message`, never in `Display`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for backend REST calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result alias for image uploads.
pub type MediaResult<T> = Result<T, MediaError>;

/// Result alias for lead mail.
pub type MailResult<T> = Result<T, MailError>;

/// Failures talking to the backend REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the credential; the session has been signed out.
    #[error("credential rejected")]
    Unauthorized {
        /// Request path.
        path: String,
    },
    /// The backend answered with a non-success status.
    #[error("backend returned an error status")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path.
        path: String,
        /// Reason supplied in the error body, if any.
        message: Option<String>,
    },
    /// Request never produced a response.
    #[error("backend request failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Request path.
        path: String,
        /// Source HTTP error.
        source: reqwest::Error,
    },
    /// Response body did not match the expected shape.
    #[error("backend response was malformed")]
    Decode {
        /// Request path.
        path: String,
        /// Source decode error.
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Whether the failure was a rejected credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Reason the server gave for rejecting the request.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status, when the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures validating or uploading an image.
#[derive(Debug, Error)]
pub enum MediaError {
    /// File is not an image.
    #[error("file is not an image")]
    NotAnImage {
        /// Declared MIME type.
        mime: String,
    },
    /// File exceeds the configured limit.
    #[error("file exceeds the upload limit")]
    TooLarge {
        /// File size in bytes.
        size: u64,
        /// Limit in megabytes.
        limit_mb: u32,
    },
    /// Local file could not be read.
    #[error("failed to read image file")]
    Read {
        /// File path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Upload request never produced a response.
    #[error("image upload request failed")]
    Transport {
        /// Source HTTP error.
        source: reqwest::Error,
    },
    /// Media host answered with a non-success status.
    #[error("media host rejected the upload")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reason supplied by the host, if any.
        message: Option<String>,
    },
    /// Response carried no `secure_url`.
    #[error("invalid response from server")]
    MissingUrl,
    /// Response body was not JSON.
    #[error("upload response was malformed")]
    Decode {
        /// Source decode error.
        source: serde_json::Error,
    },
}

impl MediaError {
    /// Whether the file was refused before any upload was attempted.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::NotAnImage { .. } | Self::TooLarge { .. })
    }

    /// Wording shown next to the upload control. Only validation failures get
    /// a specific message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAnImage { .. } => "Please select a valid image file".to_string(),
            Self::TooLarge { limit_mb, .. } => format!("File too large. Max {limit_mb}MB allowed"),
            Self::Read { .. }
            | Self::Transport { .. }
            | Self::Rejected { .. }
            | Self::MissingUrl
            | Self::Decode { .. } => "Upload failed. Please try again.".to_string(),
        }
    }
}

/// Failures handing a lead to the mail service.
#[derive(Debug, Error)]
pub enum MailError {
    /// Request never produced a response.
    #[error("mail request failed")]
    Transport {
        /// Source HTTP error.
        source: reqwest::Error,
    },
    /// Mail service answered with a non-success status.
    #[error("mail service rejected the lead")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}
