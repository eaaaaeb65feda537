//! Session state holder.
//!
//! # Design
//! - One writer task owns the `watch::Sender<Session>`; handles only read the
//!   snapshot or send commands to the writer.
//! - The writer multiplexes (biased, commands first) the provider's identity
//!   channel and the command channel. Each identity notification is handled to
//!   completion, role resolution included, before the next one is read.
//! - Rapid notifications coalesce in the `watch` channel, so the latest identity
//!   always wins.
//! - Credential slot writes are a side channel for request code that cannot
//!   await the session; their failures are logged and never abort handling.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use makkah_api_models::Role;
use makkah_events::{Event, EventBus};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::error::IdentityResult;
use crate::identity::{Credential, Identity, IdentityProvider, ProfileUpdate};
use crate::resolver::RoleResolver;
use crate::routes::Route;
use crate::store::{CREDENTIAL_SLOT, KeyValueStore};

const COMMAND_BUFFER: usize = 32;

/// Current identity, resolved role and the resolution-in-progress flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Signed-in principal, if any.
    pub identity: Option<Identity>,
    /// Resolved role; only meaningful while `identity` is present.
    pub role: Option<Role>,
    /// True from an identity notification until its handling completes.
    pub resolving: bool,
}

impl Session {
    /// State at process start: nothing known yet, resolution pending.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            identity: None,
            role: None,
            resolving: true,
        }
    }

    /// Whether a principal is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Whether the signed-in principal holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity.is_some() && self.role == Some(Role::Admin)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug)]
enum SessionCommand {
    /// Mark a sign-in or registration as in flight.
    MarkResolving { ack: oneshot::Sender<()> },
    /// A sign-in or registration failed; no notification will follow.
    Settle,
    /// The backend rejected the credential.
    ForceSignOut {
        return_to: Option<String>,
        ack: oneshot::Sender<()>,
    },
}

/// Starts the session writer task.
pub struct SessionHolder;

impl SessionHolder {
    /// Spawn the writer task and return a handle to it.
    ///
    /// The provider's current identity is handled as the first notification.
    #[must_use]
    pub fn spawn(
        provider: Arc<dyn IdentityProvider>,
        resolver: Arc<dyn RoleResolver>,
        store: Arc<dyn KeyValueStore>,
        events: EventBus,
    ) -> SessionHandle {
        let (state_tx, state_rx) = watch::channel(Session::initial());
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let writer = Writer {
            identities: provider.subscribe(),
            provider: Arc::clone(&provider),
            resolver,
            store: Arc::clone(&store),
            events: events.clone(),
            state: state_tx,
        };
        tokio::spawn(writer.run(commands_rx));
        SessionHandle {
            provider,
            store,
            events,
            state: state_rx,
            commands: commands_tx,
        }
    }
}

struct Writer {
    provider: Arc<dyn IdentityProvider>,
    resolver: Arc<dyn RoleResolver>,
    store: Arc<dyn KeyValueStore>,
    events: EventBus,
    identities: watch::Receiver<Option<Identity>>,
    state: watch::Sender<Session>,
}

impl Writer {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let first = self.identities.borrow_and_update().clone();
        self.handle_notification(first).await;

        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command).await,
                    None => commands_open = false,
                },
                changed = self.identities.changed() => {
                    if changed.is_err() {
                        debug!("identity provider closed; session writer exiting");
                        break;
                    }
                    let next = self.identities.borrow_and_update().clone();
                    self.handle_notification(next).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::MarkResolving { ack } => {
                self.state.send_modify(|session| session.resolving = true);
                let _ = ack.send(());
            }
            SessionCommand::Settle => {
                self.state.send_modify(|session| session.resolving = false);
                self.publish_settled();
            }
            SessionCommand::ForceSignOut { return_to, ack } => {
                self.force_sign_out(return_to).await;
                let _ = ack.send(());
            }
        }
    }

    async fn handle_notification(&mut self, identity: Option<Identity>) {
        self.events.publish(Event::IdentityChanged {
            email: identity.as_ref().and_then(|i| i.email.clone()),
        });
        let next = identity.clone();
        self.state.send_modify(move |session| {
            let same_principal = matches!(
                (&session.identity, &next),
                (Some(current), Some(incoming)) if current.uid == incoming.uid
            );
            if !same_principal {
                session.role = None;
            }
            session.identity = next;
            session.resolving = true;
        });

        match identity {
            None => self.apply_signed_out(),
            Some(identity) => {
                let role = self.resolve(&identity).await;
                info!(user = identity.label(), role = %role, "session resolved");
                self.state.send_modify(|session| {
                    session.role = Some(role);
                    session.resolving = false;
                });
            }
        }
        self.publish_settled();
    }

    async fn resolve(&self, identity: &Identity) -> Role {
        let credential = match self.provider.mint_credential(identity).await {
            Ok(credential) => credential,
            Err(err) => {
                warn!(error = %err, "credential mint failed; defaulting to user");
                // A previous principal's credential must not outlive it.
                if let Err(err) = self.store.remove(CREDENTIAL_SLOT) {
                    warn!(error = %err, "failed to discard cached credential");
                }
                return Role::User;
            }
        };
        if let Err(err) = self.store.set(CREDENTIAL_SLOT, credential.expose()) {
            warn!(error = %err, "failed to cache credential");
        }
        match AssertUnwindSafe(self.resolver.resolve(&credential))
            .catch_unwind()
            .await
        {
            Ok(role) => role,
            Err(_) => {
                warn!("role resolution panicked; defaulting to user");
                Role::User
            }
        }
    }

    fn apply_signed_out(&self) {
        if let Err(err) = self.store.remove(CREDENTIAL_SLOT) {
            warn!(error = %err, "failed to discard cached credential");
        }
        self.state.send_modify(|session| {
            session.identity = None;
            session.role = None;
            session.resolving = false;
        });
    }

    async fn force_sign_out(&mut self, return_to: Option<String>) {
        info!(return_to = ?return_to, "credential rejected; forcing sign-out");
        if let Err(err) = self.store.remove(CREDENTIAL_SLOT) {
            warn!(error = %err, "failed to discard cached credential");
        }
        if let Err(err) = self.provider.sign_out().await {
            warn!(error = %err, "identity provider sign-out failed");
        }
        // The provider's none-notification is applied here; mark it seen.
        if self.identities.borrow().is_none() {
            let _ = self.identities.borrow_and_update();
        } else {
            debug!("provider still reports an identity after forced sign-out");
        }
        self.apply_signed_out();
        self.publish_settled();
        self.events.publish(Event::Redirected {
            to: Route::SignIn {
                redirect: return_to,
            }
            .path(),
        });
    }

    fn publish_settled(&self) {
        let session = self.state.borrow();
        self.events.publish(Event::SessionSettled {
            email: session
                .identity
                .as_ref()
                .and_then(|identity| identity.email.clone()),
            admin: session.is_admin(),
        });
    }
}

/// Cloneable access to the session: snapshot reads plus the imperative
/// operations that delegate to the identity provider.
#[derive(Clone)]
pub struct SessionHandle {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn KeyValueStore>,
    events: EventBus,
    state: watch::Receiver<Session>,
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Current session value.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every session change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.state.clone()
    }

    /// Wait until no resolution is in flight and return that session.
    pub async fn settled(&self) -> Session {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(|session| !session.resolving)
            .await
            .map(|session| session.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    /// Last minted credential, read from the persisted slot.
    #[must_use]
    pub fn stored_credential(&self) -> Option<Credential> {
        self.store.get(CREDENTIAL_SLOT).map(Credential::new)
    }

    /// Event bus the session publishes on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Mark resolution in flight, then sign in.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; the session settles back to its prior state.
    pub async fn begin_sign_in(&self, email: &str, password: &str) -> IdentityResult<Identity> {
        self.mark_resolving().await;
        let outcome = self.provider.sign_in(email, password).await;
        if outcome.is_err() {
            self.settle_after_failure().await;
        }
        outcome
    }

    /// Mark resolution in flight, then create an account.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; the session settles back to its prior state.
    pub async fn begin_registration(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<Identity> {
        self.mark_resolving().await;
        let outcome = self.provider.register(email, password).await;
        if outcome.is_err() {
            self.settle_after_failure().await;
        }
        outcome
    }

    /// Discard the cached credential and sign out.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn begin_sign_out(&self) -> IdentityResult<()> {
        if let Err(err) = self.store.remove(CREDENTIAL_SLOT) {
            warn!(error = %err, "failed to discard cached credential");
        }
        self.provider.sign_out().await
    }

    /// Change display name and/or avatar.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn begin_profile_update(&self, update: ProfileUpdate) -> IdentityResult<Identity> {
        self.provider.update_profile(update).await
    }

    /// Request a verification email for the current identity.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn begin_email_verification(&self) -> IdentityResult<()> {
        self.provider.send_email_verification().await
    }

    /// Request a password reset email.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn begin_password_reset(&self, email: &str) -> IdentityResult<()> {
        self.provider.send_password_reset(email).await
    }

    /// Sign out because the backend rejected the credential, then redirect to
    /// sign-in carrying `return_to`. Completes once the writer has applied it.
    pub async fn force_sign_out(&self, return_to: Option<String>) {
        let (ack, done) = oneshot::channel();
        self.send(SessionCommand::ForceSignOut { return_to, ack })
            .await;
        let _ = done.await;
    }

    /// Settle after a failed sign-in unless the provider reported a new
    /// identity anyway; the writer settles once it handles that notification.
    async fn settle_after_failure(&self) {
        let reported = self
            .provider
            .subscribe()
            .borrow()
            .as_ref()
            .map(|identity| identity.uid.clone());
        let applied = self
            .state
            .borrow()
            .identity
            .as_ref()
            .map(|identity| identity.uid.clone());
        if reported == applied {
            self.send(SessionCommand::Settle).await;
        } else {
            debug!("provider changed identity despite the error; awaiting its notification");
        }
    }

    async fn mark_resolving(&self) {
        let (ack, done) = oneshot::channel();
        self.send(SessionCommand::MarkResolving { ack }).await;
        let _ = done.await;
    }

    async fn send(&self, command: SessionCommand) {
        if self.commands.send(command).await.is_err() {
            warn!("session writer has stopped; command dropped");
        }
    }
}
