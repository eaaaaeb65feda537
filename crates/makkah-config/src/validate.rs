//! Validation helpers for a merged configuration.

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::SiteConfig;

/// Validate every section of a merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails.
pub fn validate_config(config: &SiteConfig) -> ConfigResult<()> {
    validate_url(&config.api.base_url, "api", "base_url")?;
    validate_url(&config.identity.identity_url, "identity", "identity_url")?;
    validate_url(&config.identity.token_url, "identity", "token_url")?;
    validate_url(&config.media.endpoint, "media", "endpoint")?;
    validate_url(&config.mail.endpoint, "mail", "endpoint")?;

    if config.media.max_size_mb == 0 {
        return Err(ConfigError::InvalidField {
            section: "media",
            field: "max_size_mb",
            value: Some("0".to_string()),
            reason: "must be greater than zero",
        });
    }
    if config.http.timeout_secs == 0 {
        return Err(ConfigError::InvalidField {
            section: "http",
            field: "timeout_secs",
            value: Some("0".to_string()),
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

pub(crate) fn validate_url(
    value: &str,
    section: &'static str,
    field: &'static str,
) -> ConfigResult<()> {
    let parsed = Url::parse(value).map_err(|_| ConfigError::InvalidField {
        section,
        field,
        value: Some(value.to_string()),
        reason: "must be an absolute URL",
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidField {
            section,
            field,
            value: Some(value.to_string()),
            reason: "must use http or https",
        });
    }
    Ok(())
}

pub(crate) fn parse_number<T: std::str::FromStr>(
    value: &str,
    section: &'static str,
    field: &'static str,
) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidField {
        section,
        field,
        value: Some(value.to_string()),
        reason: "must be a non-negative integer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        validate_config(&SiteConfig::default()).expect("defaults are valid");
    }

    #[test]
    fn rejects_relative_and_non_http_urls() {
        let mut config = SiteConfig::default();
        config.api.base_url = "/api".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidField {
                field: "base_url",
                reason: "must be an absolute URL",
                ..
            })
        ));

        config.api.base_url = "ftp://host/api".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidField {
                reason: "must use http or https",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = SiteConfig::default();
        config.http.timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidField {
                field: "timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn parse_number_reports_field() {
        let err = parse_number::<u64>("ten", "http", "timeout_secs").expect_err("not a number");
        assert_eq!(
            err.detail(),
            "http.timeout_secs = 'ten' is invalid: must be a non-negative integer"
        );
    }
}
