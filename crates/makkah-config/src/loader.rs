//! Layered loading: defaults, then an optional JSON document, then the
//! `MAKKAH_*` environment overlay.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::model::SiteConfig;
use crate::validate::{parse_number, validate_config};

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builder that merges configuration layers and validates the result.
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: EnvLookup,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading the process environment and no file.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read a JSON document before applying the environment overlay.
    #[must_use]
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.file = path;
        self
    }

    /// Replace the environment lookup.
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Merge all layers and validate.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be read or parsed, when an
    /// environment value is malformed, or when validation fails.
    pub fn load(self) -> ConfigResult<SiteConfig> {
        let mut config = match &self.file {
            Some(path) => read_document(path)?,
            None => SiteConfig::default(),
        };
        self.apply_env(&mut config)?;
        if config.storage.state_dir.is_none() {
            let home = self.lookup("HOME").map(PathBuf::from);
            config.storage.state_dir = Some(config.storage.resolve_state_dir(home));
        }
        validate_config(&config)?;
        tracing::debug!(
            api = %config.api.base_url,
            file = ?self.file,
            "configuration loaded"
        );
        Ok(config)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|value| !value.trim().is_empty())
    }

    fn apply_env(&self, config: &mut SiteConfig) -> ConfigResult<()> {
        if let Some(value) = self.lookup("MAKKAH_API_URL") {
            config.api.base_url = value;
        }
        if let Some(value) = self.lookup("MAKKAH_FIREBASE_API_KEY") {
            config.identity.api_key = Some(value);
        }
        if let Some(value) = self.lookup("MAKKAH_IDENTITY_URL") {
            config.identity.identity_url = value;
        }
        if let Some(value) = self.lookup("MAKKAH_TOKEN_URL") {
            config.identity.token_url = value;
        }
        if let Some(value) = self.lookup("MAKKAH_MEDIA_ENDPOINT") {
            config.media.endpoint = value;
        }
        if let Some(value) = self.lookup("MAKKAH_CLOUDINARY_CLOUD_NAME") {
            config.media.cloud_name = Some(value);
        }
        if let Some(value) = self.lookup("MAKKAH_CLOUDINARY_UPLOAD_PRESET") {
            config.media.upload_preset = Some(value);
        }
        if let Some(value) = self.lookup("MAKKAH_MEDIA_MAX_MB") {
            config.media.max_size_mb = parse_number(&value, "media", "max_size_mb")?;
        }
        if let Some(value) = self.lookup("MAKKAH_MAIL_ENDPOINT") {
            config.mail.endpoint = value;
        }
        if let Some(value) = self.lookup("MAKKAH_EMAILJS_SERVICE_ID") {
            config.mail.service_id = Some(value);
        }
        if let Some(value) = self.lookup("MAKKAH_EMAILJS_TEMPLATE_ID") {
            config.mail.template_id = Some(value);
        }
        if let Some(value) = self.lookup("MAKKAH_EMAILJS_PUBLIC_KEY") {
            config.mail.public_key = Some(value);
        }
        if let Some(value) = self.lookup("MAKKAH_STATE_DIR") {
            config.storage.state_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = self.lookup("MAKKAH_HTTP_TIMEOUT_SECS") {
            config.http.timeout_secs = parse_number(&value, "http", "timeout_secs")?;
        }
        Ok(())
    }
}

fn read_document(path: &Path) -> ConfigResult<SiteConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read_document",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
