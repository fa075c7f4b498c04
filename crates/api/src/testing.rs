//! Helpers for tests in this crate and in the integration-test crate.

use crate::config::ApiConfig;

/// Configuration with defaults everywhere except the required password.
///
/// # Panics
///
/// Never in practice: the fixed lookup always satisfies validation.
#[must_use]
pub fn test_config(require_auth: bool) -> ApiConfig {
    let require_auth = if require_auth { "true" } else { "false" };
    ApiConfig::from_lookup(&|key: &str| match key {
        "CONTACTS_DB_PASSWORD" => Some("k9#Vq2!mZt".to_owned()),
        "CONTACTS_REQUIRE_AUTH" => Some(require_auth.to_owned()),
        _ => None,
    })
    .expect("test configuration is valid")
}
