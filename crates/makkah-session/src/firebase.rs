//! Identity provider backed by the Identity Toolkit and Secure Token REST APIs.
//!
//! # Design
//! - The signed-in user record (tokens included) lives in the `identity` slot so a
//!   later process restores the same identity, as the browser SDK does.
//! - Identity changes are published on a `watch` channel; profile updates count
//!   as changes because the principal's fields moved.
//! - The state mutex is never held across an await point.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::{IdentityError, IdentityResult};
use crate::identity::{Credential, Identity, IdentityProvider, ProfileUpdate};
use crate::store::{IDENTITY_SLOT, KeyValueStore};

/// Tokens with less validity than this are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// REST endpoints and key for one identity project.
#[derive(Debug, Clone)]
pub struct FirebaseEndpoints {
    /// Web API key.
    pub api_key: String,
    /// Identity Toolkit base, e.g. `https://identitytoolkit.googleapis.com/v1`.
    pub identity_url: String,
    /// Secure Token base, e.g. `https://securetoken.googleapis.com/v1`.
    pub token_url: String,
}

impl FirebaseEndpoints {
    fn account(&self, action: &str) -> String {
        format!(
            "{}/accounts:{action}?key={}",
            self.identity_url.trim_end_matches('/'),
            urlencoding::encode(&self.api_key)
        )
    }

    fn refresh(&self) -> String {
        format!(
            "{}/token?key={}",
            self.token_url.trim_end_matches('/'),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    identity: Identity,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl StoredUser {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Identity provider speaking the Firebase Authentication REST protocol.
pub struct FirebaseIdentityProvider {
    http: reqwest::Client,
    endpoints: FirebaseEndpoints,
    store: Arc<dyn KeyValueStore>,
    user: Mutex<Option<StoredUser>>,
    notifier: watch::Sender<Option<Identity>>,
}

impl FirebaseIdentityProvider {
    /// Build the provider, restoring any user persisted by an earlier run.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        endpoints: FirebaseEndpoints,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let restored = store.get(IDENTITY_SLOT).and_then(|raw| {
            serde_json::from_str::<StoredUser>(&raw)
                .map_err(|err| warn!(error = %err, "discarding unreadable persisted identity"))
                .ok()
        });
        if let Some(user) = &restored {
            info!(user = user.identity.label(), "restored persisted identity");
        }
        let (notifier, _) = watch::channel(restored.as_ref().map(|user| user.identity.clone()));
        Self {
            http,
            endpoints,
            store,
            user: Mutex::new(restored),
            notifier,
        }
    }

    fn current(&self) -> Option<StoredUser> {
        self.user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make `user` current. A user that cannot be persisted is not installed
    /// and not announced; signing out always clears the in-memory user.
    fn install(&self, user: Option<StoredUser>) -> IdentityResult<()> {
        let persisted = match &user {
            Some(user) => {
                let raw = serde_json::to_string(user).map_err(|source| IdentityError::Decode {
                    operation: "identity.persist",
                    source,
                })?;
                self.store
                    .set(IDENTITY_SLOT, &raw)
                    .map_err(|source| IdentityError::Store { source })?;
                Ok(())
            }
            None => self
                .store
                .remove(IDENTITY_SLOT)
                .map_err(|source| IdentityError::Store { source }),
        };
        let identity = user.as_ref().map(|user| user.identity.clone());
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = user;
        self.notifier.send_replace(identity);
        persisted
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: String,
        body: serde_json::Value,
    ) -> IdentityResult<T> {
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|source| IdentityError::Transport { operation, source })?;
        decode(operation, response).await
    }

    async fn account_session(
        &self,
        operation: &'static str,
        action: &str,
        email: &str,
        password: &str,
    ) -> IdentityResult<Identity> {
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let account: AccountResponse = self
            .post_json(operation, self.endpoints.account(action), body)
            .await?;
        let user = stored_from_account(account, None)?;
        let identity = user.identity.clone();
        self.install(Some(user))?;
        info!(user = identity.label(), operation, "identity signed in");
        Ok(identity)
    }

    async fn fresh_user(&self) -> IdentityResult<StoredUser> {
        let user = self.current().ok_or(IdentityError::NotSignedIn)?;
        if user.is_fresh(Utc::now()) {
            return Ok(user);
        }
        self.refresh(user).await
    }

    async fn refresh(&self, user: StoredUser) -> IdentityResult<StoredUser> {
        let operation = "identity.refresh";
        let response = self
            .http
            .post(self.endpoints.refresh())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", user.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|source| IdentityError::Transport { operation, source })?;
        let refreshed: RefreshResponse = decode(operation, response).await?;
        let user = StoredUser {
            expires_at: expiry(&refreshed.expires_in),
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            identity: user.identity,
        };
        let persisted = serde_json::to_string(&user).map_err(|source| IdentityError::Decode {
            operation,
            source,
        })?;
        if let Err(err) = self.store.set(IDENTITY_SLOT, &persisted) {
            warn!(error = %err, "failed to persist refreshed identity");
        }
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    #[instrument(name = "identity.sign_in", skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Identity> {
        self.account_session("identity.sign_in", "signInWithPassword", email, password)
            .await
    }

    #[instrument(name = "identity.register", skip(self, password))]
    async fn register(&self, email: &str, password: &str) -> IdentityResult<Identity> {
        self.account_session("identity.register", "signUp", email, password)
            .await
    }

    async fn sign_out(&self) -> IdentityResult<()> {
        if self.current().is_some() {
            info!("identity signed out");
        }
        self.install(None)
    }

    #[instrument(name = "identity.update_profile", skip(self))]
    async fn update_profile(&self, update: ProfileUpdate) -> IdentityResult<Identity> {
        let user = self.fresh_user().await?;
        let body = json!({
            "idToken": user.id_token,
            "displayName": update.display_name.or_else(|| user.identity.display_name.clone()),
            "photoUrl": update.photo_url.or_else(|| user.identity.photo_url.clone()),
            "returnSecureToken": true,
        });
        let account: AccountResponse = self
            .post_json("identity.update_profile", self.endpoints.account("update"), body)
            .await?;
        let updated = stored_from_account(account, Some(&user))?;
        let identity = updated.identity.clone();
        self.install(Some(updated))?;
        Ok(identity)
    }

    #[instrument(name = "identity.verify_email", skip(self))]
    async fn send_email_verification(&self) -> IdentityResult<()> {
        let user = self.fresh_user().await?;
        let body = json!({ "requestType": "VERIFY_EMAIL", "idToken": user.id_token });
        let _: serde_json::Value = self
            .post_json(
                "identity.verify_email",
                self.endpoints.account("sendOobCode"),
                body,
            )
            .await?;
        Ok(())
    }

    #[instrument(name = "identity.password_reset", skip(self))]
    async fn send_password_reset(&self, email: &str) -> IdentityResult<()> {
        let body = json!({ "requestType": "PASSWORD_RESET", "email": email });
        let _: serde_json::Value = self
            .post_json(
                "identity.password_reset",
                self.endpoints.account("sendOobCode"),
                body,
            )
            .await?;
        Ok(())
    }

    async fn mint_credential(&self, identity: &Identity) -> IdentityResult<Credential> {
        let user = self.fresh_user().await?;
        if user.identity.uid != identity.uid {
            return Err(IdentityError::NotSignedIn);
        }
        Ok(Credential::new(user.id_token))
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.notifier.subscribe()
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> IdentityResult<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| IdentityError::Transport { operation, source })?;
    if !status.is_success() {
        let code = serde_json::from_slice::<ErrorEnvelope>(&body).map_or_else(
            |_| format!("HTTP_{}", status.as_u16()),
            |envelope| envelope.error.message,
        );
        warn!(operation, status = status.as_u16(), code = %code, "identity request rejected");
        return Err(IdentityError::from_code(&code));
    }
    serde_json::from_slice(&body).map_err(|source| IdentityError::Decode { operation, source })
}

fn stored_from_account(
    account: AccountResponse,
    previous: Option<&StoredUser>,
) -> IdentityResult<StoredUser> {
    let identity = Identity {
        uid: account.local_id,
        email: account.email,
        display_name: account.display_name,
        photo_url: account.photo_url,
        email_verified: account.email_verified,
    };
    match (account.id_token, account.refresh_token, previous) {
        (Some(id_token), Some(refresh_token), _) => Ok(StoredUser {
            identity,
            id_token,
            refresh_token,
            expires_at: expiry(account.expires_in.as_deref().unwrap_or_default()),
        }),
        (_, _, Some(previous)) => Ok(StoredUser {
            identity,
            ..previous.clone()
        }),
        _ => Err(IdentityError::Rejected {
            code: "MISSING_TOKEN".into(),
        }),
    }
}

fn expiry(expires_in: &str) -> DateTime<Utc> {
    let seconds = expires_in.trim().parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(seconds)
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer, store: Arc<dyn KeyValueStore>) -> FirebaseIdentityProvider {
        FirebaseIdentityProvider::new(
            reqwest::Client::new(),
            FirebaseEndpoints {
                api_key: "test-key".into(),
                identity_url: server.url("/v1"),
                token_url: server.url("/token-api"),
            },
            store,
        )
    }

    fn account_body(expires_in: &str) -> serde_json::Value {
        json!({
            "localId": "uid-7",
            "email": "zainab@example.com",
            "displayName": "Zainab",
            "idToken": "id-token-1",
            "refreshToken": "refresh-1",
            "expiresIn": expires_in,
        })
    }

    #[tokio::test]
    async fn sign_in_persists_and_notifies() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/accounts:signInWithPassword")
                .query_param("key", "test-key")
                .json_body(json!({
                    "email": "zainab@example.com",
                    "password": "secret1",
                    "returnSecureToken": true,
                }));
            then.status(200).json_body(account_body("3600"));
        });
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let provider = provider(&server, Arc::clone(&store));
        let mut notifications = provider.subscribe();
        assert!(notifications.borrow_and_update().is_none());

        let identity = provider.sign_in("zainab@example.com", "secret1").await?;
        mock.assert();
        assert_eq!(identity.uid, "uid-7");
        assert!(notifications.has_changed()?);
        assert_eq!(
            notifications.borrow_and_update().as_ref().map(|i| i.uid.as_str()),
            Some("uid-7")
        );
        assert!(store.get(IDENTITY_SLOT).is_some());

        let credential = provider.mint_credential(&identity).await?;
        assert_eq!(credential.expose(), "id-token-1");

        let restored = FirebaseIdentityProvider::new(
            reqwest::Client::new(),
            provider.endpoints.clone(),
            Arc::clone(&store),
        );
        assert_eq!(
            restored.subscribe().borrow().as_ref().map(|i| i.uid.clone()),
            Some("uid-7".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn registration_conflict_maps_to_email_in_use() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signUp");
            then.status(400)
                .json_body(json!({ "error": { "code": 400, "message": "EMAIL_EXISTS" } }));
        });
        let provider = provider(&server, Arc::new(MemoryStore::new()));
        let err = provider
            .register("taken@example.com", "secret1")
            .await
            .expect_err("conflict");
        assert!(matches!(err, IdentityError::EmailAlreadyInUse));
        assert_eq!(err.user_message(), "Email already registered");
        assert!(provider.subscribe().borrow().is_none());
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _slot: &str) -> Option<String> {
            None
        }

        fn set(&self, _slot: &str, _value: &str) -> crate::StoreResult<()> {
            Err(crate::StoreError::Io {
                operation: "test.set",
                path: std::path::PathBuf::from("session.json"),
                source: std::io::Error::other("disk full"),
            })
        }

        fn remove(&self, _slot: &str) -> crate::StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unpersisted_sign_in_is_not_announced() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(200).json_body(account_body("3600"));
        });
        let provider = provider(&server, Arc::new(ReadOnlyStore));
        let notifications = provider.subscribe();

        let err = provider
            .sign_in("zainab@example.com", "secret1")
            .await
            .expect_err("store rejected the user");
        assert!(matches!(err, IdentityError::Store { .. }));
        assert!(!notifications.has_changed().unwrap_or(true));
        assert!(provider.subscribe().borrow().is_none());
        assert!(provider.current().is_none());
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_before_minting() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(200).json_body(account_body("60"));
        });
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/token-api/token")
                .query_param("key", "test-key")
                .form_urlencoded_tuple("grant_type", "refresh_token")
                .form_urlencoded_tuple("refresh_token", "refresh-1");
            then.status(200).json_body(json!({
                "id_token": "id-token-2",
                "refresh_token": "refresh-2",
                "expires_in": "3600",
                "user_id": "uid-7",
            }));
        });
        let provider = provider(&server, Arc::new(MemoryStore::new()));
        let identity = provider.sign_in("zainab@example.com", "secret1").await?;

        let credential = provider.mint_credential(&identity).await?;
        assert_eq!(credential.expose(), "id-token-2");
        let again = provider.mint_credential(&identity).await?;
        assert_eq!(again.expose(), "id-token-2");
        refresh.assert_hits(1);
        Ok(())
    }

    #[tokio::test]
    async fn revoked_refresh_token_reports_expiry() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(200).json_body(account_body("0"));
        });
        server.mock(|when, then| {
            when.method(POST).path("/token-api/token");
            then.status(400)
                .json_body(json!({ "error": { "code": 400, "message": "TOKEN_EXPIRED" } }));
        });
        let provider = provider(&server, Arc::new(MemoryStore::new()));
        let identity = provider.sign_in("zainab@example.com", "secret1").await?;
        let err = provider
            .mint_credential(&identity)
            .await
            .expect_err("expired");
        assert!(matches!(err, IdentityError::SessionExpired));
        Ok(())
    }

    #[tokio::test]
    async fn profile_update_keeps_tokens_and_notifies() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(200).json_body(account_body("3600"));
        });
        let update = server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:update").json_body(json!({
                "idToken": "id-token-1",
                "displayName": "Zainab A.",
                "photoUrl": "https://cdn.example.com/z.png",
                "returnSecureToken": true,
            }));
            then.status(200).json_body(json!({
                "localId": "uid-7",
                "email": "zainab@example.com",
                "displayName": "Zainab A.",
                "photoUrl": "https://cdn.example.com/z.png",
                "emailVerified": true,
            }));
        });
        let provider = provider(&server, Arc::new(MemoryStore::new()));
        let identity = provider.sign_in("zainab@example.com", "secret1").await?;
        let mut notifications = provider.subscribe();
        let _ = notifications.borrow_and_update();

        let updated = provider
            .update_profile(ProfileUpdate {
                display_name: Some("Zainab A.".into()),
                photo_url: Some("https://cdn.example.com/z.png".into()),
            })
            .await?;
        update.assert();
        assert_eq!(updated.display_name.as_deref(), Some("Zainab A."));
        assert!(updated.email_verified);
        assert!(notifications.has_changed()?);
        assert_eq!(
            provider.mint_credential(&identity).await?.expose(),
            "id-token-1"
        );
        Ok(())
    }

    #[tokio::test]
    async fn oob_requests_carry_request_type() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let reset = server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:sendOobCode").json_body(json!({
                "requestType": "PASSWORD_RESET",
                "email": "bilal@example.com",
            }));
            then.status(200).json_body(json!({ "email": "bilal@example.com" }));
        });
        let provider = provider(&server, Arc::new(MemoryStore::new()));
        provider.send_password_reset("bilal@example.com").await?;
        reset.assert();

        let err = provider
            .send_email_verification()
            .await
            .expect_err("signed out");
        assert!(matches!(err, IdentityError::NotSignedIn));
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_clears_persisted_user() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(200).json_body(account_body("3600"));
        });
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let provider = provider(&server, Arc::clone(&store));
        let identity = provider.sign_in("zainab@example.com", "secret1").await?;
        provider.sign_out().await?;
        assert!(store.get(IDENTITY_SLOT).is_none());
        assert!(provider.subscribe().borrow().is_none());
        assert!(matches!(
            provider.mint_credential(&identity).await,
            Err(IdentityError::NotSignedIn)
        ));
        Ok(())
    }
}
