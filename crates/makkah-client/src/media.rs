//! Unsigned image uploads to the media host.
//!
//! Uploads carry no backend credential. The host answers with a JSON document
//! whose `secure_url` is the public address stored on records.

use std::path::Path;

use makkah_config::{ConfigResult, MediaConfig};
use makkah_events::{Event, EventBus};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{MediaError, MediaResult};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostErrorBody {
    error: HostError,
}

#[derive(Debug, Deserialize)]
struct HostError {
    message: String,
}

/// Client for the media host's upload endpoint.
#[derive(Clone)]
pub struct MediaUploader {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: String,
    max_size_mb: u32,
    events: EventBus,
}

impl MediaUploader {
    /// Build an uploader from the media configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the cloud name or preset is missing.
    pub fn from_config(
        config: &MediaConfig,
        http: reqwest::Client,
        events: EventBus,
    ) -> ConfigResult<Self> {
        Ok(Self {
            http,
            upload_url: config.upload_url()?,
            upload_preset: config.require_upload_preset()?.to_string(),
            max_size_mb: config.max_size_mb,
            events,
        })
    }

    /// Largest accepted file, in megabytes.
    #[must_use]
    pub const fn max_size_mb(&self) -> u32 {
        self.max_size_mb
    }

    /// Check a file before uploading it.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotAnImage`] or [`MediaError::TooLarge`].
    pub fn validate(&self, mime: &str, size: u64) -> MediaResult<()> {
        if !mime.starts_with("image/") {
            return Err(MediaError::NotAnImage {
                mime: mime.to_string(),
            });
        }
        if size > u64::from(self.max_size_mb) * 1024 * 1024 {
            return Err(MediaError::TooLarge {
                size,
                limit_mb: self.max_size_mb,
            });
        }
        Ok(())
    }

    /// Validate and upload an in-memory file; returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns a validation, transport, status or response error.
    #[instrument(name = "media.upload", skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str, mime: &str) -> MediaResult<String> {
        self.validate(mime, bytes.len() as u64)?;
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|_| MediaError::NotAnImage {
                mime: mime.to_string(),
            })?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| MediaError::Transport { source })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| MediaError::Transport { source })?;
        if !status.is_success() {
            let message = serde_json::from_slice::<HostErrorBody>(&body)
                .ok()
                .map(|body| body.error.message);
            warn!(status = status.as_u16(), ?message, "media host rejected upload");
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse =
            serde_json::from_slice(&body).map_err(|source| MediaError::Decode { source })?;
        let url = parsed
            .secure_url
            .filter(|url| !url.is_empty())
            .ok_or(MediaError::MissingUrl)?;
        info!(url = %url, "image uploaded");
        self.events.publish(Event::MediaUploaded { url: url.clone() });
        Ok(url)
    }

    /// Read, validate and upload a local file.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Read`] when the file cannot be read, otherwise as
    /// [`MediaUploader::upload`].
    pub async fn upload_path(&self, path: &Path) -> MediaResult<String> {
        let mime = mime_for_path(path);
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| MediaError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        self.validate(mime, metadata.len())?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| MediaError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        self.upload(bytes, &filename, mime).await
    }
}

/// MIME type implied by a file extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// What the upload control currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// A stored image at a public URL.
    Remote(String),
    /// A local file being uploaded.
    Local(String),
}

/// Image field of an admin form: the committed URL plus an optimistic preview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSlot {
    current: Option<String>,
    preview: Option<Preview>,
    error: Option<String>,
}

impl ImageSlot {
    /// Slot showing `current`, if any.
    #[must_use]
    pub fn new(current: Option<String>) -> Self {
        Self {
            preview: current.clone().map(Preview::Remote),
            current,
            error: None,
        }
    }

    /// Committed image URL.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// What the control shows.
    #[must_use]
    pub const fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Message shown under the control.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Upload a file into the slot. Validation failures leave the preview
    /// untouched; upload failures revert it to the committed image.
    ///
    /// # Errors
    ///
    /// Returns the uploader's error after recording its message on the slot.
    pub async fn upload(
        &mut self,
        uploader: &MediaUploader,
        bytes: Vec<u8>,
        filename: &str,
        mime: &str,
    ) -> MediaResult<String> {
        if let Err(err) = uploader.validate(mime, bytes.len() as u64) {
            self.error = Some(err.user_message());
            return Err(err);
        }
        self.error = None;
        self.preview = Some(Preview::Local(filename.to_string()));
        match uploader.upload(bytes, filename, mime).await {
            Ok(url) => {
                self.current = Some(url.clone());
                self.preview = Some(Preview::Remote(url.clone()));
                Ok(url)
            }
            Err(err) => {
                self.error = Some(err.user_message());
                self.preview = self.current.clone().map(Preview::Remote);
                Err(err)
            }
        }
    }

    /// Remove the image.
    pub fn clear(&mut self) {
        self.current = None;
        self.preview = None;
        self.error = None;
    }
}
