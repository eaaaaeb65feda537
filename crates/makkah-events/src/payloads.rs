//! Event payload types carried across the workspace.

use chrono::{DateTime, Utc};

/// Identifier assigned to each event emitted on the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Typed domain events surfaced to observers (views, CLI, tests).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The identity provider reported a new current identity (or none).
    IdentityChanged {
        /// Email label of the new identity, `None` when signed out.
        email: Option<String>,
    },
    /// A notification was fully handled and the session is settled.
    SessionSettled {
        /// Email label of the settled identity.
        email: Option<String>,
        /// Whether the settled role grants admin screens.
        admin: bool,
    },
    /// The backend rejected the stored credential.
    CredentialRejected {
        /// Request path that returned `401`.
        path: String,
    },
    /// A navigation away from the current view was requested.
    Redirected {
        /// Target path, including any query string.
        to: String,
    },
    /// An admin screen persisted a record.
    ContentSaved {
        /// Backend collection name (`packages`, `blogs`, ...).
        collection: String,
        /// Record identifier when known.
        id: Option<String>,
    },
    /// An admin screen deleted a record.
    ContentDeleted {
        /// Backend collection name.
        collection: String,
        /// Identifier of the deleted record.
        id: String,
    },
    /// An image upload finished and produced a public URL.
    MediaUploaded {
        /// Public URL returned by the media host.
        url: String,
    },
    /// A contact or booking lead was handed to the mail service.
    LeadSent {
        /// Subject line used for the templated mail.
        subject: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for log filtering.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IdentityChanged { .. } => "identity_changed",
            Self::SessionSettled { .. } => "session_settled",
            Self::CredentialRejected { .. } => "credential_rejected",
            Self::Redirected { .. } => "redirected",
            Self::ContentSaved { .. } => "content_saved",
            Self::ContentDeleted { .. } => "content_deleted",
            Self::MediaUploaded { .. } => "media_uploaded",
            Self::LeadSent { .. } => "lead_sent",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let event = Event::Redirected {
            to: "/login?redirect=%2Fadmin".into(),
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["type"], "redirected");
        assert_eq!(value["to"], "/login?redirect=%2Fadmin");
    }

    #[test]
    fn kind_matches_serde_tag() {
        let event = Event::SessionSettled {
            email: None,
            admin: false,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["type"], event.kind());
    }
}
