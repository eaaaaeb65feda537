//! In-memory stand-ins for the identity provider and role resolvers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use makkah_api_models::Role;
use makkah_session::{
    Credential, Identity, IdentityError, IdentityProvider, IdentityResult, ProfileUpdate,
    RoleResolver,
};
use tokio::sync::watch;

struct Account {
    password: String,
    identity: Identity,
}

/// Identity provider keeping accounts in memory and notifying synchronously.
pub struct FakeIdentityProvider {
    notifier: watch::Sender<Option<Identity>>,
    accounts: Mutex<HashMap<String, Account>>,
    calls: Mutex<Vec<String>>,
    fail_mint: AtomicBool,
    fail_after_notify: AtomicBool,
    next_uid: AtomicU64,
}

impl Default for FakeIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeIdentityProvider {
    /// Provider with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (notifier, _) = watch::channel(None);
        Self {
            notifier,
            accounts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_mint: AtomicBool::new(false),
            fail_after_notify: AtomicBool::new(false),
            next_uid: AtomicU64::new(1),
        }
    }

    /// Provider that restored `identity` from an earlier run.
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        let provider = Self::new();
        provider.notifier.send_replace(Some(identity));
        provider
    }

    /// Register an account that `sign_in` will accept.
    pub fn add_account(&self, identity: Identity, password: &str) {
        let email = identity.email.clone().unwrap_or_else(|| identity.uid.clone());
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email,
                Account {
                    password: password.to_string(),
                    identity,
                },
            );
    }

    /// Push an arbitrary notification, as the provider would on its own.
    pub fn notify(&self, identity: Option<Identity>) {
        self.notifier.send_replace(identity);
    }

    /// Make `mint_credential` fail until reset.
    pub fn fail_minting(&self, fail: bool) {
        self.fail_mint.store(fail, Ordering::SeqCst);
    }

    /// Make `sign_in` announce the account and still report an error, as a
    /// provider does when it cannot persist the session it just opened.
    pub fn fail_after_notifying(&self, fail: bool) {
        self.fail_after_notify.store(fail, Ordering::SeqCst);
    }

    /// Operations invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Credential the provider mints for `identity`.
    #[must_use]
    pub fn credential_for(identity: &Identity) -> Credential {
        Credential::new(format!("token-{}", identity.uid))
    }

    fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.into());
    }

    fn current(&self) -> Option<Identity> {
        self.notifier.borrow().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Identity> {
        self.record(format!("sign_in:{email}"));
        let identity = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let account = accounts.get(email).ok_or(IdentityError::UserNotFound)?;
            if account.password != password {
                return Err(IdentityError::InvalidCredentials);
            }
            account.identity.clone()
        };
        self.notifier.send_replace(Some(identity.clone()));
        if self.fail_after_notify.load(Ordering::SeqCst) {
            return Err(IdentityError::SessionExpired);
        }
        Ok(identity)
    }

    async fn register(&self, email: &str, password: &str) -> IdentityResult<Identity> {
        self.record(format!("register:{email}"));
        if password.len() < 6 {
            return Err(IdentityError::WeakPassword);
        }
        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            if accounts.contains_key(email) {
                return Err(IdentityError::EmailAlreadyInUse);
            }
            let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst));
            let identity = Identity {
                uid,
                email: Some(email.to_string()),
                display_name: None,
                photo_url: None,
                email_verified: false,
            };
            accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };
        self.notifier.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> IdentityResult<()> {
        self.record("sign_out");
        self.notifier.send_replace(None);
        Ok(())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> IdentityResult<Identity> {
        self.record("update_profile");
        let mut identity = self.current().ok_or(IdentityError::NotSignedIn)?;
        if let Some(name) = update.display_name {
            identity.display_name = Some(name);
        }
        if let Some(photo) = update.photo_url {
            identity.photo_url = Some(photo);
        }
        self.notifier.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn send_email_verification(&self) -> IdentityResult<()> {
        self.record("send_email_verification");
        self.current().map(|_| ()).ok_or(IdentityError::NotSignedIn)
    }

    async fn send_password_reset(&self, email: &str) -> IdentityResult<()> {
        self.record(format!("send_password_reset:{email}"));
        Ok(())
    }

    async fn mint_credential(&self, identity: &Identity) -> IdentityResult<Credential> {
        if self.fail_mint.load(Ordering::SeqCst) {
            return Err(IdentityError::SessionExpired);
        }
        Ok(Self::credential_for(identity))
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.notifier.subscribe()
    }
}

/// Resolver returning a fixed role and recording the credentials it saw.
pub struct StaticRoleResolver {
    role: Role,
    seen: Mutex<Vec<String>>,
}

impl StaticRoleResolver {
    /// Resolver that always answers `role`.
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Raw credentials passed to `resolve`, in order.
    #[must_use]
    pub fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RoleResolver for StaticRoleResolver {
    async fn resolve(&self, credential: &Credential) -> Role {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(credential.expose().to_string());
        self.role
    }
}

/// Resolver that panics, for exercising the fail-closed path.
pub struct PanickingRoleResolver;

#[async_trait]
impl RoleResolver for PanickingRoleResolver {
    async fn resolve(&self, _credential: &Credential) -> Role {
        panic!("role service exploded");
    }
}

/// Resolver that holds every lookup until the gate opens.
pub struct GatedRoleResolver {
    role: Role,
    gate: watch::Sender<bool>,
}

impl GatedRoleResolver {
    /// Closed gate answering `role` once opened.
    #[must_use]
    pub fn new(role: Role) -> Self {
        let (gate, _) = watch::channel(false);
        Self { role, gate }
    }

    /// Let pending and future lookups complete.
    pub fn open(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl RoleResolver for GatedRoleResolver {
    async fn resolve(&self, _credential: &Credential) -> Role {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        self.role
    }
}
