//! State behind the back-office CRUD screens.
//!
//! A board owns the fetched list, an error banner and a busy flag. Local state
//! only changes after the backend accepted the operation. A rejected
//! credential never leaves a banner behind because the session has already
//! redirected to sign-in.

use makkah_api_models::{Collection, Resource, Role, UserAccount};
use makkah_events::Event;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};

/// One collection's admin screen.
pub struct AdminBoard<R> {
    client: ApiClient,
    items: Vec<R>,
    error: Option<String>,
    busy: bool,
}

/// User management screen.
pub type UserBoard = AdminBoard<UserAccount>;

impl<R: Resource> AdminBoard<R> {
    /// Empty board; call [`AdminBoard::load`] to populate it.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            items: Vec::new(),
            error: None,
            busy: false,
        }
    }

    /// Records currently listed.
    #[must_use]
    pub fn items(&self) -> &[R] {
        &self.items
    }

    /// Error banner, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a list fetch is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Hide the error banner.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Replace the list with the backend's current records.
    ///
    /// # Errors
    ///
    /// Returns the client error; the banner reads "Failed to load <collection>".
    pub async fn load(&mut self) -> ApiResult<()> {
        self.busy = true;
        let outcome = self.client.list::<R>().await;
        self.busy = false;
        match outcome {
            Ok(items) => {
                self.items = items;
                Ok(())
            }
            Err(err) => {
                self.set_banner(
                    err.is_unauthorized(),
                    format!("Failed to load {}", R::COLLECTION),
                );
                Err(err)
            }
        }
    }

    /// Create `draft`, or update the record `editing` when set, then reload.
    ///
    /// A failed reload after a successful save only raises the load banner.
    ///
    /// # Errors
    ///
    /// Returns the client error; the banner prefers the server's reason over
    /// "Error saving <record>".
    pub async fn save(&mut self, draft: &R, editing: Option<&str>) -> ApiResult<Option<R>> {
        let outcome = match editing {
            Some(id) => self.client.update(id, draft).await,
            None => self.client.create(draft).await,
        };
        let saved = match outcome {
            Ok(saved) => saved,
            Err(err) => {
                let banner = err.server_message().map_or_else(
                    || format!("Error saving {}", R::COLLECTION.singular()),
                    str::to_string,
                );
                self.set_banner(err.is_unauthorized(), banner);
                return Err(err);
            }
        };

        let id = editing
            .map(str::to_string)
            .or_else(|| saved.as_ref().and_then(|record| record.id().map(str::to_string)));
        info!(collection = %R::COLLECTION, id = ?id, "record saved");
        self.client.session().events().publish(Event::ContentSaved {
            collection: R::COLLECTION.as_str().to_string(),
            id,
        });
        self.error = None;
        if let Err(err) = self.load().await {
            warn!(error = %err, "reload after save failed");
        }
        Ok(saved)
    }

    /// Delete the record `id` and drop it from the list.
    ///
    /// # Errors
    ///
    /// Returns the client error; the banner reads "Error deleting <record>".
    pub async fn delete(&mut self, id: &str) -> ApiResult<()> {
        if let Err(err) = self.client.delete::<R>(id).await {
            self.set_banner(
                err.is_unauthorized(),
                format!("Error deleting {}", R::COLLECTION.singular()),
            );
            return Err(err);
        }
        self.items.retain(|item| item.id() != Some(id));
        info!(collection = %R::COLLECTION, id, "record deleted");
        self.client.session().events().publish(Event::ContentDeleted {
            collection: R::COLLECTION.as_str().to_string(),
            id: id.to_string(),
        });
        Ok(())
    }

    fn set_banner(&mut self, unauthorized: bool, banner: String) {
        self.error = if unauthorized { None } else { Some(banner) };
    }
}

impl AdminBoard<UserAccount> {
    /// Flip a listed account between user and admin; returns the new role.
    ///
    /// # Errors
    ///
    /// Returns the client error, or a 404 without any request when `id` is not
    /// on the loaded list; the banner reads "Error updating role".
    pub async fn toggle_role(&mut self, id: &str) -> ApiResult<Role> {
        let Some(current) = self
            .items
            .iter()
            .find(|account| account.id() == Some(id))
            .map(|account| account.role)
        else {
            warn!(id, "role toggle requested for an unlisted account");
            self.set_banner(false, "Error updating role".to_string());
            return Err(ApiError::Status {
                status: 404,
                path: Collection::Users.item_path(id),
                message: Some("User not found".to_string()),
            });
        };
        let next = current.toggled();
        if let Err(err) = self.client.set_user_role(id, next).await {
            self.set_banner(err.is_unauthorized(), "Error updating role".to_string());
            return Err(err);
        }
        for account in &mut self.items {
            if account.id.as_deref() == Some(id) {
                account.role = next;
            }
        }
        info!(id, role = %next, "role updated");
        Ok(next)
    }
}

/// Split a comma separated inclusion list, dropping blank entries.
#[must_use]
pub fn split_inclusions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
