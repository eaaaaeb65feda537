//! Typed configuration sections.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// Complete site configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Backend REST API.
    pub api: ApiConfig,
    /// Identity provider endpoints and key.
    pub identity: IdentityConfig,
    /// Image hosting.
    pub media: MediaConfig,
    /// Templated lead mail.
    pub mail: MailConfig,
    /// Local persisted state.
    pub storage: StorageConfig,
    /// Outbound HTTP behaviour.
    pub http: HttpConfig,
}

/// Backend REST API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://host/api`; collection paths are appended.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_BASE_URL.to_string(),
        }
    }
}

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Web API key of the identity project.
    pub api_key: Option<String>,
    /// Identity Toolkit base URL.
    pub identity_url: String,
    /// Secure Token base URL.
    pub token_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            identity_url: defaults::IDENTITY_URL.to_string(),
            token_url: defaults::TOKEN_URL.to_string(),
        }
    }
}

impl IdentityConfig {
    /// The API key, required by every identity operation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when no key is configured.
    pub fn require_api_key(&self) -> ConfigResult<&str> {
        require(
            self.api_key.as_deref(),
            "identity",
            "api_key",
            "MAKKAH_FIREBASE_API_KEY",
        )
    }
}

/// Image hosting settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Upload REST base; `/<cloud>/image/upload` is appended.
    pub endpoint: String,
    /// Cloud (account) name.
    pub cloud_name: Option<String>,
    /// Unsigned upload preset identifier.
    pub upload_preset: Option<String>,
    /// Largest accepted file, in megabytes.
    pub max_size_mb: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::MEDIA_ENDPOINT.to_string(),
            cloud_name: None,
            upload_preset: None,
            max_size_mb: defaults::MEDIA_MAX_SIZE_MB,
        }
    }
}

impl MediaConfig {
    /// Fully-qualified image upload URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the cloud name is absent.
    pub fn upload_url(&self) -> ConfigResult<String> {
        let cloud = require(
            self.cloud_name.as_deref(),
            "media",
            "cloud_name",
            "MAKKAH_CLOUDINARY_CLOUD_NAME",
        )?;
        Ok(format!(
            "{}/{cloud}/image/upload",
            self.endpoint.trim_end_matches('/')
        ))
    }

    /// Upload preset sent with every file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the preset is absent.
    pub fn require_upload_preset(&self) -> ConfigResult<&str> {
        require(
            self.upload_preset.as_deref(),
            "media",
            "upload_preset",
            "MAKKAH_CLOUDINARY_UPLOAD_PRESET",
        )
    }

    /// Size limit in bytes.
    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        u64::from(self.max_size_mb) * 1024 * 1024
    }
}

/// Templated mail settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Send endpoint.
    pub endpoint: String,
    /// Mail service identifier.
    pub service_id: Option<String>,
    /// Template identifier.
    pub template_id: Option<String>,
    /// Public key identifying the account.
    pub public_key: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::MAIL_ENDPOINT.to_string(),
            service_id: None,
            template_id: None,
            public_key: None,
        }
    }
}

/// Resolved mail account identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAccount {
    /// Send endpoint.
    pub endpoint: String,
    /// Mail service identifier.
    pub service_id: String,
    /// Template identifier.
    pub template_id: String,
    /// Public key.
    pub public_key: String,
}

impl MailConfig {
    /// Resolve all identifiers needed to send a lead.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for the first absent identifier.
    pub fn account(&self) -> ConfigResult<MailAccount> {
        Ok(MailAccount {
            endpoint: self.endpoint.clone(),
            service_id: require(
                self.service_id.as_deref(),
                "mail",
                "service_id",
                "MAKKAH_EMAILJS_SERVICE_ID",
            )?
            .to_string(),
            template_id: require(
                self.template_id.as_deref(),
                "mail",
                "template_id",
                "MAKKAH_EMAILJS_TEMPLATE_ID",
            )?
            .to_string(),
            public_key: require(
                self.public_key.as_deref(),
                "mail",
                "public_key",
                "MAKKAH_EMAILJS_PUBLIC_KEY",
            )?
            .to_string(),
        })
    }
}

/// Local persisted state settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the session store; defaults to `~/.makkah`.
    pub state_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Directory to use, falling back to `<home>/.makkah` or `./.makkah`.
    #[must_use]
    pub fn resolve_state_dir(&self, home: Option<PathBuf>) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            home.unwrap_or_else(|| PathBuf::from("."))
                .join(defaults::STATE_DIR_NAME)
        })
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

fn require<'a>(
    value: Option<&'a str>,
    section: &'static str,
    field: &'static str,
    env: &'static str,
) -> ConfigResult<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingField {
            section,
            field,
            env,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_url_requires_cloud_name() {
        let mut media = MediaConfig::default();
        assert!(matches!(
            media.upload_url(),
            Err(ConfigError::MissingField {
                field: "cloud_name",
                ..
            })
        ));
        media.cloud_name = Some("pilgrim".into());
        media.endpoint = "http://127.0.0.1:9000/v1_1/".into();
        assert_eq!(
            media.upload_url().expect("url"),
            "http://127.0.0.1:9000/v1_1/pilgrim/image/upload"
        );
        assert_eq!(media.max_size_bytes(), 5 * 1024 * 1024);
    }

    #[test]
    fn mail_account_rejects_blank_identifiers() {
        let mail = MailConfig {
            service_id: Some("svc".into()),
            template_id: Some("  ".into()),
            public_key: Some("pk".into()),
            ..MailConfig::default()
        };
        assert!(matches!(
            mail.account(),
            Err(ConfigError::MissingField {
                field: "template_id",
                ..
            })
        ));
    }

    #[test]
    fn state_dir_falls_back_to_home() {
        let storage = StorageConfig::default();
        assert_eq!(
            storage.resolve_state_dir(Some(PathBuf::from("/home/amina"))),
            PathBuf::from("/home/amina/.makkah")
        );
        assert_eq!(
            storage.resolve_state_dir(None),
            PathBuf::from("./.makkah")
        );
    }
}
