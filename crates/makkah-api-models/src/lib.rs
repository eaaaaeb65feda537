#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the travel agency backend API.
//!
//! The backend is a document store behind a thin REST layer: every record
//! carries a string `_id`, collections live at `/{collection}[/:id]`, and
//! error bodies put the human-readable reason in an `error` field. These types
//! are re-used by the session crate (role lookup), the REST client and the CLI
//! so the wire contract has a single definition.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Coarse authorization level resolved from the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular signed-in visitor.
    #[default]
    User,
    /// Back-office operator with access to the admin screens.
    Admin,
}

impl Role {
    /// Map a role lookup body onto a role.
    ///
    /// The mapping is total: anything other than an explicit `"admin"`,
    /// including a missing body or a missing field, is the lowest privilege.
    #[must_use]
    pub fn from_response(response: Option<&RoleResponse>) -> Self {
        response
            .and_then(|body| body.role.as_deref())
            .map_or(Self::User, Self::from_label)
    }

    /// Map a raw role label onto a role, defaulting to [`Role::User`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }

    /// Wire label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// The opposite role, used by the user management screen.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::User => Self::Admin,
            Self::Admin => Self::User,
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Body returned by `GET /users/role`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RoleResponse {
    /// Raw role label; absent for accounts the backend has not classified.
    #[serde(default)]
    pub role: Option<String>,
}

/// Body sent to `PUT /users/:id/role`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleUpdate {
    /// Role to assign.
    pub role: Role,
}

/// Error document returned by the backend on failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ApiErrorBody {
    /// Human-readable failure reason.
    #[serde(default)]
    pub error: Option<String>,
    /// Alternate field some routes use for the reason.
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Best available human-readable reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
    }
}

/// Backend collections exposed through the generic CRUD surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Hajj and Umrah travel packages.
    Packages,
    /// Blog posts.
    Blogs,
    /// Customer reviews.
    Reviews,
    /// Agency events (seminars, departures).
    Events,
    /// Shop products (affiliate links).
    Products,
    /// Registered accounts.
    Users,
}

impl Collection {
    /// All collections, in admin sidebar order.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Packages,
            Self::Blogs,
            Self::Reviews,
            Self::Events,
            Self::Products,
            Self::Users,
        ]
    }

    /// Path segment under the backend base URL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::Blogs => "blogs",
            Self::Reviews => "reviews",
            Self::Events => "events",
            Self::Products => "products",
            Self::Users => "users",
        }
    }

    /// Singular noun used in admin messages ("Error saving package").
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Packages => "package",
            Self::Blogs => "blog",
            Self::Reviews => "review",
            Self::Events => "event",
            Self::Products => "product",
            Self::Users => "user",
        }
    }

    /// Collection path (`/packages`).
    #[must_use]
    pub fn path(self) -> String {
        format!("/{}", self.as_str())
    }

    /// Item path (`/packages/:id`).
    #[must_use]
    pub fn item_path(self, id: &str) -> String {
        format!("/{}/{}", self.as_str(), id)
    }
}

impl Display for Collection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A record stored in one of the backend collections.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record lives in.
    const COLLECTION: Collection;

    /// Backend identifier, absent on drafts that were never saved.
    fn id(&self) -> Option<&str>;
}

/// Package category, which also selects the public listing page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum PackageCategory {
    /// Umrah packages (default for new drafts).
    #[default]
    Umrah,
    /// Hajj packages.
    Hajj,
}

impl PackageCategory {
    /// Display label, identical to the wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Umrah => "Umrah",
            Self::Hajj => "Hajj",
        }
    }
}

impl Display for PackageCategory {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for PackageCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "umrah" => Ok(Self::Umrah),
            "hajj" => Ok(Self::Hajj),
            other => Err(format!("unknown package category '{other}'")),
        }
    }
}

/// Travel package offered on the Hajj/Umrah pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Backend identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Package title.
    pub title: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Price in BDT.
    #[serde(default)]
    pub price: f64,
    /// Free-form duration label ("15 days").
    #[serde(default)]
    pub duration: String,
    /// Included services.
    #[serde(default)]
    pub inclusions: Vec<String>,
    /// Departure region.
    #[serde(default)]
    pub region: String,
    /// Hajj or Umrah.
    #[serde(default)]
    pub category: PackageCategory,
}

impl Resource for Package {
    const COLLECTION: Collection = Collection::Packages;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Blog post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    /// Backend identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Post title.
    pub title: String,
    /// Post body.
    #[serde(default)]
    pub content: String,
    /// Author byline.
    #[serde(default)]
    pub author: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: String,
    /// Publication date assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl Resource for Blog {
    const COLLECTION: Collection = Collection::Blogs;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Customer review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Backend identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Reviewer name.
    pub name: String,
    /// Star rating, 1 to 5.
    #[serde(default = "default_rating")]
    pub rating: u8,
    /// Review text.
    #[serde(default)]
    pub review_text: String,
    /// Reviewer photo URL.
    #[serde(default)]
    pub photo_url: String,
    /// Creation date assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

const fn default_rating() -> u8 {
    5
}

impl Default for Review {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            rating: default_rating(),
            review_text: String::new(),
            photo_url: String::new(),
            date: None,
        }
    }
}

impl Resource for Review {
    const COLLECTION: Collection = Collection::Reviews;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Lifecycle state of an agency event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Scheduled in the future (default for new drafts).
    #[default]
    Upcoming,
    /// Currently running.
    Ongoing,
    /// Finished.
    Completed,
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown event status '{other}'")),
        }
    }
}

/// Agency event shown on the home page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventListing {
    /// Backend identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Scheduled date.
    pub date: DateTime<Utc>,
    /// Venue.
    #[serde(default)]
    pub location: String,
    /// Lifecycle state.
    #[serde(default)]
    pub status: EventStatus,
}

impl Resource for EventListing {
    const COLLECTION: Collection = Collection::Events;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Shop product (affiliate listing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Product name.
    pub name: String,
    /// Product image URL.
    #[serde(default)]
    pub image_url: String,
    /// Price.
    #[serde(default)]
    pub price: f64,
    /// Shop category.
    #[serde(default)]
    pub category: String,
    /// Outbound affiliate link.
    #[serde(default)]
    pub affiliate_url: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

impl Resource for Product {
    const COLLECTION: Collection = Collection::Products;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Registered account as listed on the user management screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    /// Backend identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Account email.
    pub email: String,
    /// Assigned role; unclassified accounts are users.
    #[serde(default)]
    pub role: Role,
}

impl Resource for UserAccount {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Blog listings come back either bare or wrapped in `{ "blogs": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BlogListing {
    /// Wrapped listing.
    Wrapped {
        /// Posts.
        blogs: Vec<Blog>,
    },
    /// Bare array.
    Bare(Vec<Blog>),
}

impl BlogListing {
    /// Flatten either shape into the post list.
    #[must_use]
    pub fn into_blogs(self) -> Vec<Blog> {
        match self {
            Self::Wrapped { blogs } | Self::Bare(blogs) => blogs,
        }
    }
}
