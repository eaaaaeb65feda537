//! Shared error types and the application context handed to command handlers.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use makkah_client::{ApiClient, ApiError, MailError, MediaError};
use makkah_config::{ConfigError, SiteConfig};
use makkah_events::EventBus;
use makkah_session::{
    Admission, FileStore, FirebaseEndpoints, FirebaseIdentityProvider, Guard, HttpRoleResolver,
    IdentityError, IdentityProvider, KeyValueStore, Route, SessionHandle, SessionHolder,
};
use reqwest::Client;

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidField { .. } | ConfigError::MissingField { .. } => {
                Self::validation(err.detail())
            }
            ConfigError::Parse { .. } | ConfigError::Io { .. } => {
                Self::failure(anyhow!(err.detail()))
            }
        }
    }
}

impl From<IdentityError> for CliError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Transport { .. }
            | IdentityError::Decode { .. }
            | IdentityError::Store { .. } => Self::failure(anyhow::Error::new(err)),
            other => Self::validation(other.user_message()),
        }
    }
}

impl From<MediaError> for CliError {
    fn from(err: MediaError) -> Self {
        if err.is_validation() {
            Self::validation(err.user_message())
        } else {
            let message = err.user_message();
            Self::failure(anyhow::Error::new(err).context(message))
        }
    }
}

/// Map a backend error onto a CLI error, preferring a screen banner when the
/// caller has one.
pub(crate) fn api_failure(err: ApiError, banner: Option<&str>) -> CliError {
    if err.is_unauthorized() {
        return CliError::validation("session rejected by the backend; sign in again with `makkah auth login`");
    }
    match (err.status(), banner) {
        (Some(400 | 409 | 422), Some(banner)) => CliError::validation(banner.to_string()),
        (Some(400 | 409 | 422), None) => CliError::validation(
            err.server_message()
                .map_or_else(|| format!("request rejected: {err}"), str::to_string),
        ),
        (_, Some(banner)) => {
            let banner = banner.to_string();
            CliError::failure(anyhow::Error::new(err).context(banner))
        }
        (_, None) => {
            let detail = match &err {
                ApiError::Status {
                    status,
                    path,
                    message,
                } => format!(
                    "{path} returned status {status}{}",
                    message
                        .as_deref()
                        .map(|message| format!(": {message}"))
                        .unwrap_or_default()
                ),
                _ => err.to_string(),
            };
            CliError::failure(anyhow::Error::new(err).context(detail))
        }
    }
}

/// Map a mail failure onto the alert wording for the form that sent it.
pub(crate) fn mail_failure(err: MailError, alert: &str) -> CliError {
    CliError::failure(anyhow::Error::new(err).context(alert.to_string()))
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) config: SiteConfig,
    pub(crate) http: Client,
    pub(crate) session: SessionHandle,
    pub(crate) events: EventBus,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Wire the HTTP client, persisted store, identity provider and session.
    pub(crate) fn build(config: SiteConfig, output: OutputFormat) -> CliResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        let state_dir = config.storage.resolve_state_dir(None);
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&state_dir).map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context("failed to open session store"))
        })?);

        // Without a key the provider still restores a persisted identity;
        // `auth` commands check for the key before calling it.
        let endpoints = FirebaseEndpoints {
            api_key: config.identity.api_key.clone().unwrap_or_default(),
            identity_url: config.identity.identity_url.clone(),
            token_url: config.identity.token_url.clone(),
        };
        let provider: Arc<dyn IdentityProvider> = Arc::new(FirebaseIdentityProvider::new(
            http.clone(),
            endpoints,
            Arc::clone(&store),
        ));
        let resolver = Arc::new(HttpRoleResolver::new(
            http.clone(),
            config.api.base_url.clone(),
        ));
        let events = EventBus::new();
        let session = SessionHolder::spawn(provider, resolver, store, events.clone());
        Ok(Self::from_parts(config, http, session, events, output))
    }

    pub(crate) const fn from_parts(
        config: SiteConfig,
        http: Client,
        session: SessionHandle,
        events: EventBus,
        output: OutputFormat,
    ) -> Self {
        Self {
            config,
            http,
            session,
            events,
            output,
        }
    }

    /// Backend client acting on behalf of `route`.
    pub(crate) fn api(&self, route: &Route) -> ApiClient {
        ApiClient::new(
            self.http.clone(),
            self.config.api.base_url.clone(),
            self.session.clone(),
        )
        .for_view(route)
    }

    /// Wait for the session to settle and apply the guard `route` requires.
    pub(crate) async fn admit(&self, route: &Route) -> CliResult<ApiClient> {
        let session = self.session.settled().await;
        match Guard::for_route(route).admit(&session, route) {
            Admission::Allow => Ok(self.api(route)),
            Admission::Redirect(Route::SignIn { .. }) => Err(CliError::validation(format!(
                "{} requires a signed-in account; run `makkah auth login`",
                route.path()
            ))),
            Admission::Redirect(_) => Err(CliError::validation(format!(
                "{} requires the admin role",
                route.path()
            ))),
            Admission::Loading => Err(CliError::failure(anyhow!(
                "session did not settle before {}",
                route.path()
            ))),
        }
    }
}
