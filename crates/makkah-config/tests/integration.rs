use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use makkah_config::{ConfigError, ConfigLoader};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn environment_overrides_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("makkah.json");
    fs::write(
        &path,
        r#"{
            "api": { "base_url": "https://staging.example.com/api" },
            "media": { "cloud_name": "from-file", "max_size_mb": 8 },
            "http": { "timeout_secs": 30 }
        }"#,
    )?;

    let config = ConfigLoader::new()
        .with_file(Some(path))
        .with_env(env(&[
            ("MAKKAH_API_URL", "http://127.0.0.1:4000/api"),
            ("MAKKAH_CLOUDINARY_UPLOAD_PRESET", "unsigned"),
            ("MAKKAH_STATE_DIR", "/tmp/makkah-state"),
        ]))
        .load()?;

    assert_eq!(config.api.base_url, "http://127.0.0.1:4000/api");
    assert_eq!(config.media.cloud_name.as_deref(), Some("from-file"));
    assert_eq!(config.media.upload_preset.as_deref(), Some("unsigned"));
    assert_eq!(config.media.max_size_mb, 8);
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(
        config.storage.state_dir,
        Some(PathBuf::from("/tmp/makkah-state"))
    );
    Ok(())
}

#[test]
fn defaults_apply_without_document() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_env(env(&[("HOME", "/home/yusuf")]))
        .load()?;
    assert_eq!(
        config.api.base_url,
        "https://travelinmakkah-backend.vercel.app/api"
    );
    assert_eq!(config.media.max_size_mb, 5);
    assert_eq!(
        config.storage.state_dir,
        Some(PathBuf::from("/home/yusuf/.makkah"))
    );
    assert!(config.identity.require_api_key().is_err());
    Ok(())
}

#[test]
fn malformed_document_reports_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json")?;

    let err = ConfigLoader::new()
        .with_file(Some(path.clone()))
        .with_env(env(&[]))
        .load()
        .expect_err("parse failure");
    assert!(matches!(err, ConfigError::Parse { path: ref p, .. } if *p == path));
    Ok(())
}

#[test]
fn malformed_env_number_is_rejected() {
    let err = ConfigLoader::new()
        .with_env(env(&[("MAKKAH_HTTP_TIMEOUT_SECS", "soon")]))
        .load()
        .expect_err("invalid timeout");
    assert!(matches!(
        err,
        ConfigError::InvalidField {
            section: "http",
            field: "timeout_secs",
            ..
        }
    ));
}

#[test]
fn missing_document_is_an_io_error() {
    let err = ConfigLoader::new()
        .with_file(Some(PathBuf::from("/nonexistent/makkah.json")))
        .with_env(env(&[]))
        .load()
        .expect_err("missing file");
    assert!(matches!(err, ConfigError::Io { .. }));
}
