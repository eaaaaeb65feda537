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

//! Outbound integrations of the travel site.
//!
//! Layout: `client.rs` (backend REST with bearer injection and rejected
//! credential handling), `admin.rs` (back-office board state), `catalog.rs`
//! (public page reads), `media.rs` (image host uploads), `mail.rs` (lead
//! mail).

pub mod admin;
pub mod catalog;
pub mod client;
pub mod error;
pub mod mail;
pub mod media;

pub use admin::{AdminBoard, UserBoard, split_inclusions};
pub use catalog::{Catalog, ShopView};
pub use client::ApiClient;
pub use error::{ApiError, ApiResult, MailError, MailResult, MediaError, MediaResult};
pub use mail::{BookingForm, ContactForm, LeadMailer, TemplateParams};
pub use media::{ImageSlot, MediaUploader, Preview, mime_for_path};
