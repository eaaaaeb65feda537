//! Role resolution against the backend.
//!
//! Resolution never fails: an unreachable or misbehaving backend yields the
//! lowest privilege.

use async_trait::async_trait;
use makkah_api_models::{Role, RoleResponse};
use tracing::{instrument, warn};

use crate::identity::Credential;

/// Asks an authority which role a credential holds.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Resolve the role for `credential`; failures map to [`Role::User`].
    async fn resolve(&self, credential: &Credential) -> Role;
}

/// Resolver calling `GET <backend>/users/role`.
#[derive(Clone)]
pub struct HttpRoleResolver {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRoleResolver {
    /// Build a resolver for the backend at `base_url` (e.g. `https://host/api`).
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/users/role", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RoleResolver for HttpRoleResolver {
    #[instrument(name = "role.resolve", skip_all)]
    async fn resolve(&self, credential: &Credential) -> Role {
        let mut request = self.http.get(self.endpoint()).bearer_auth(credential.expose());
        if let Some(request_id) = makkah_telemetry::current_request_id() {
            request = request.header("x-request-id", request_id);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "role lookup failed; defaulting to user");
                return Role::User;
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "role lookup rejected; defaulting to user");
            return Role::User;
        }
        match response.json::<RoleResponse>().await {
            Ok(body) => Role::from_response(Some(&body)),
            Err(err) => {
                warn!(error = %err, "role lookup body unreadable; defaulting to user");
                Role::User
            }
        }
    }
}
