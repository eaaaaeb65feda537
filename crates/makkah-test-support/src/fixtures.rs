//! Test fixtures and environment helpers.

use std::collections::HashMap;

use makkah_api_models::{Package, PackageCategory};
use makkah_session::Identity;

/// Identity with a verified email.
#[must_use]
pub fn identity(uid: &str, email: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        display_name: None,
        photo_url: None,
        email_verified: true,
    }
}

/// Saved Hajj package as the backend returns it.
#[must_use]
pub fn hajj_package(id: &str) -> Package {
    Package {
        id: Some(id.to_string()),
        title: "Premium Hajj 2026".to_string(),
        description: "Shifting tents in Mina, Aziziyah hotel".to_string(),
        price: 1_150_000.0,
        duration: "40 days".to_string(),
        inclusions: vec!["Visa".to_string(), "Flights".to_string()],
        region: "Dhaka".to_string(),
        category: PackageCategory::Hajj,
    }
}

/// Environment lookup over a fixed set of pairs, for config loaders.
#[must_use]
pub fn env_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    move |key| values.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_lookup_returns_only_known_keys() {
        let lookup = env_lookup(&[("MAKKAH_API_URL", "http://localhost/api")]);
        assert_eq!(
            lookup("MAKKAH_API_URL").as_deref(),
            Some("http://localhost/api")
        );
        assert!(lookup("HOME").is_none());
    }

    #[test]
    fn fixtures_carry_identifiers() {
        assert_eq!(hajj_package("p1").id.as_deref(), Some("p1"));
        assert_eq!(identity("u1", "a@example.com").label(), "a@example.com");
    }
}
