//! Default endpoints and limits.
//!
//! # Design
//! - Centralize third-party endpoints so tests can override every one of them.
//! - Keep numeric limits next to the endpoints they constrain.

/// Backend REST API base.
pub(crate) const API_BASE_URL: &str = "https://travelinmakkah-backend.vercel.app/api";
/// Identity Toolkit REST base.
pub(crate) const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
/// Secure Token REST base used to refresh credentials.
pub(crate) const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
/// Image upload REST base; the cloud name is appended.
pub(crate) const MEDIA_ENDPOINT: &str = "https://api.cloudinary.com/v1_1";
/// Largest accepted image upload, in megabytes.
pub(crate) const MEDIA_MAX_SIZE_MB: u32 = 5;
/// Templated mail send endpoint.
pub(crate) const MAIL_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";
/// Default HTTP timeout for all outbound calls.
pub(crate) const HTTP_TIMEOUT_SECS: u64 = 10;
/// Directory name for persisted session state under the home directory.
pub(crate) const STATE_DIR_NAME: &str = ".makkah";
