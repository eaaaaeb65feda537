//! Identity provider seam.
//!
//! # Design
//! - The provider owns the signed-in principal; the session holder only observes it.
//! - Change notifications travel over a `watch` channel whose current value is
//!   the first notification every subscriber sees.
//! - Credentials redact themselves in `Debug` output so they never reach logs.

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::IdentityResult;

/// Signed-in principal as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned stable identifier.
    pub uid: String,
    /// Email the account signed in with.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name set through a profile update.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL set through a profile update.
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Whether the email address has been verified.
    #[serde(default)]
    pub email_verified: bool,
}

impl Identity {
    /// Human-facing label: the email when known, otherwise the uid.
    #[must_use]
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.uid)
    }
}

/// Short-lived bearer credential proving an identity to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw bearer token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("Credential(***)")
    }
}

/// Profile fields that can be changed after sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New display name; `None` leaves it unchanged.
    pub display_name: Option<String>,
    /// New avatar URL; `None` leaves it unchanged.
    pub photo_url: Option<String>,
}

/// Operations offered by an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Identity>;

    /// Create an account and sign it in.
    async fn register(&self, email: &str, password: &str) -> IdentityResult<Identity>;

    /// Sign the current identity out.
    async fn sign_out(&self) -> IdentityResult<()>;

    /// Change display name and/or avatar of the current identity.
    async fn update_profile(&self, update: ProfileUpdate) -> IdentityResult<Identity>;

    /// Ask the provider to email a verification link to the current identity.
    async fn send_email_verification(&self) -> IdentityResult<()>;

    /// Ask the provider to email a password reset link.
    async fn send_password_reset(&self, email: &str) -> IdentityResult<()>;

    /// Issue a bearer credential for `identity`.
    async fn mint_credential(&self, identity: &Identity) -> IdentityResult<Credential>;

    /// Identity-change notifications, current value first.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}
