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

//! Session coordination for the travel site.
//!
//! Layout: `identity.rs` (provider seam), `firebase.rs` (REST provider),
//! `store.rs` (persisted slots), `resolver.rs` (role lookup), `holder.rs`
//! (single-writer session state), `routes.rs` and `guard.rs` (views and
//! admission).

pub mod error;
pub mod firebase;
pub mod guard;
pub mod holder;
pub mod identity;
pub mod resolver;
pub mod routes;
pub mod store;

pub use error::{IdentityError, IdentityResult, StoreError, StoreResult};
pub use firebase::{FirebaseEndpoints, FirebaseIdentityProvider};
pub use guard::{Admission, Guard, SignInView, View, admission, sign_in_view};
pub use holder::{Session, SessionHandle, SessionHolder};
pub use identity::{Credential, Identity, IdentityProvider, ProfileUpdate};
pub use makkah_api_models::Role;
pub use resolver::{HttpRoleResolver, RoleResolver};
pub use routes::{Requirement, Route};
pub use store::{CREDENTIAL_SLOT, FileStore, IDENTITY_SLOT, KeyValueStore, MemoryStore};
