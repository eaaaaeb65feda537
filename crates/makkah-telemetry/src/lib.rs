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

//! Logging and request correlation for the Makkah workspace.
//!
//! `init` installs the stderr subscriber; `context` scopes a request
//! identifier around one CLI command so outbound calls can forward it.

pub mod context;
pub mod error;
pub mod init;

pub use context::{current_command, current_request_id, new_request_id, with_request_context};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
