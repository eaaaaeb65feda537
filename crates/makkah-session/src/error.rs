//! # Design
//!
//! - Keep error messages constant while carrying context fields for debugging.
//! - Identity failures carry the end-user wording separately from `Display`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for identity provider operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Result alias for key-value store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Email/password pair was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// No account exists for the supplied email.
    #[error("user not found")]
    UserNotFound,
    /// Registration with an email that already has an account.
    #[error("email already in use")]
    EmailAlreadyInUse,
    /// Registration with a password the provider considers too weak.
    #[error("weak password")]
    WeakPassword,
    /// Refresh token expired or was revoked; the user must sign in again.
    #[error("session expired")]
    SessionExpired,
    /// Operation requires a signed-in identity.
    #[error("not signed in")]
    NotSignedIn,
    /// Provider rejected the request with a code this crate does not map.
    #[error("identity provider rejected the request")]
    Rejected {
        /// Provider error code.
        code: String,
    },
    /// Request never produced a response.
    #[error("identity provider request failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Source HTTP error.
        source: reqwest::Error,
    },
    /// Response body could not be decoded.
    #[error("identity provider response was malformed")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Source decode error.
        source: serde_json::Error,
    },
    /// Persisting the signed-in user failed.
    #[error("identity persistence failed")]
    Store {
        /// Source store error.
        source: StoreError,
    },
}

impl IdentityError {
    /// Map a provider error code (`EMAIL_EXISTS`, `WEAK_PASSWORD : ...`) to an error.
    #[must_use]
    pub fn from_code(raw: &str) -> Self {
        let code = raw.split(':').next().unwrap_or(raw).trim();
        match code {
            "EMAIL_EXISTS" => Self::EmailAlreadyInUse,
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => Self::UserNotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredentials,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "TOKEN_EXPIRED"
            | "INVALID_REFRESH_TOKEN"
            | "INVALID_ID_TOKEN"
            | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => Self::SessionExpired,
            other => Self::Rejected {
                code: other.to_string(),
            },
        }
    }

    /// Message shown to the person at the sign-in form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials | Self::UserNotFound => "Invalid email or password".into(),
            Self::EmailAlreadyInUse => "Email already registered".into(),
            Self::WeakPassword => "Password should be at least 6 characters".into(),
            Self::SessionExpired => "Your session has expired, please sign in again".into(),
            Self::NotSignedIn => "Please sign in first".into(),
            Self::Rejected { code } => code.clone(),
            Self::Transport { .. } | Self::Decode { .. } | Self::Store { .. } => {
                self.to_string()
            }
        }
    }
}

/// Failures reported by a [`crate::KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// File system operation failed.
    #[error("store filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the operation.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Store document could not be encoded.
    #[error("store document could not be encoded")]
    Encode {
        /// Source serde error.
        source: serde_json::Error,
    },
}
