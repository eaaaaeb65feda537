//! HTTP client for the travel agency backend.
//!
//! Every request carries `x-request-id` and, while the session has an
//! identity, the cached bearer credential. A `401` from any route signs the
//! session out and redirects to sign-in before the error reaches the caller.

use makkah_api_models::{ApiErrorBody, Blog, BlogListing, Resource, Role, RoleUpdate};
use makkah_events::Event;
use makkah_session::{Route, SessionHandle};
use makkah_telemetry::{current_request_id, new_request_id};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::{ApiError, ApiResult};

const HEADER_REQUEST_ID: &str = "x-request-id";

/// REST client bound to one backend and one session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
    view: Option<String>,
}

impl ApiClient {
    /// Build a client for the backend at `base_url` (e.g. `https://host/api`).
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: SessionHandle) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            view: None,
        }
    }

    /// Copy of this client acting on behalf of `route`; a rejected credential
    /// redirects to sign-in with `route` as the return target.
    #[must_use]
    pub fn for_view(&self, route: &Route) -> Self {
        Self {
            view: Some(route.path()),
            ..self.clone()
        }
    }

    /// Session this client reads credentials from.
    #[must_use]
    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// List every record of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    #[instrument(name = "api.list", skip(self), fields(collection = %R::COLLECTION))]
    pub async fn list<R: Resource>(&self) -> ApiResult<Vec<R>> {
        self.get_json(&R::COLLECTION.path()).await
    }

    /// Fetch one record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    #[instrument(name = "api.fetch", skip(self), fields(collection = %R::COLLECTION))]
    pub async fn fetch<R: Resource>(&self, id: &str) -> ApiResult<R> {
        self.get_json(&R::COLLECTION.item_path(id)).await
    }

    /// Create a record. The stored record is returned when the backend echoes it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport or status failures.
    #[instrument(name = "api.create", skip(self, record), fields(collection = %R::COLLECTION))]
    pub async fn create<R: Resource>(&self, record: &R) -> ApiResult<Option<R>> {
        let path = R::COLLECTION.path();
        let response = self
            .execute("create", &path, self.request(Method::POST, &path).json(record))
            .await?;
        Ok(Self::lenient_body(&path, response).await)
    }

    /// Replace the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport or status failures.
    #[instrument(name = "api.update", skip(self, record), fields(collection = %R::COLLECTION))]
    pub async fn update<R: Resource>(&self, id: &str, record: &R) -> ApiResult<Option<R>> {
        let path = R::COLLECTION.item_path(id);
        let response = self
            .execute("update", &path, self.request(Method::PUT, &path).json(record))
            .await?;
        Ok(Self::lenient_body(&path, response).await)
    }

    /// Delete the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport or status failures.
    #[instrument(name = "api.delete", skip(self), fields(collection = %R::COLLECTION))]
    pub async fn delete<R: Resource>(&self, id: &str) -> ApiResult<()> {
        let path = R::COLLECTION.item_path(id);
        self.execute("delete", &path, self.request(Method::DELETE, &path))
            .await?;
        Ok(())
    }

    /// Blog posts; the backend may wrap them in `{ "blogs": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    pub async fn list_blogs(&self) -> ApiResult<Vec<Blog>> {
        let listing: BlogListing = self.get_json("/blogs").await?;
        Ok(listing.into_blogs())
    }

    /// Distinct shop categories.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    pub async fn product_categories(&self) -> ApiResult<Vec<String>> {
        self.get_json("/products/categories").await
    }

    /// Assign `role` to the account `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport or status failures.
    #[instrument(name = "api.set_user_role", skip(self))]
    pub async fn set_user_role(&self, id: &str, role: Role) -> ApiResult<()> {
        let path = format!("/users/{id}/role");
        let body = RoleUpdate { role };
        self.execute("set_user_role", &path, self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self
            .execute("get", path, self.request(Method::GET, path))
            .await?;
        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            operation: "read_body",
            path: path.to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn lenient_body<T: DeserializeOwned>(path: &str, response: Response) -> Option<T> {
        let bytes = response.bytes().await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(path, error = %err, "response body not a record; ignoring");
                None
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = current_request_id().unwrap_or_else(new_request_id);
        let mut request = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header(HEADER_REQUEST_ID, request_id);
        if self.session.snapshot().is_signed_in()
            && let Some(credential) = self.session.stored_credential()
        {
            request = request.bearer_auth(credential.expose());
        }
        request
    }

    async fn execute(
        &self,
        operation: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> ApiResult<Response> {
        let response = request.send().await.map_err(|source| ApiError::Transport {
            operation,
            path: path.to_string(),
            source,
        })?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "backend rejected credential; signing out");
            self.session.events().publish(Event::CredentialRejected {
                path: path.to_string(),
            });
            self.session.force_sign_out(self.view.clone()).await;
            return Err(ApiError::Unauthorized {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.reason().map(str::to_string));
            debug!(path, status = status.as_u16(), ?message, "backend returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                message,
            });
        }
        Ok(response)
    }
}
