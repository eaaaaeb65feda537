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

//! Layered site configuration for the pilgrimage travel client.
//!
//! Layout: `model.rs` (typed sections), `loader.rs` (defaults, JSON document,
//! `MAKKAH_*` environment overlay), `validate.rs` (URL and limit checks).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use model::{
    ApiConfig, HttpConfig, IdentityConfig, MailAccount, MailConfig, MediaConfig, SiteConfig,
    StorageConfig,
};
pub use validate::validate_config;
