//! Connection settings for the HTTP transport.

use std::path::Path;

use serde::{Deserialize, Serialize};

use couchlayer_core::error::{CouchError, CouchResult};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpTransportConfig {
    /// Server root that relative request urls are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_base_url() -> String {
    "http://localhost:5984".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("couchlayer/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads a config from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::Initialization`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> CouchResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path)
            .map_err(|e| CouchError::Initialization(format!("cannot read {}: {e}", path.display())))?;

        serde_json::from_str(&contents)
            .map_err(|e| CouchError::Initialization(format!("invalid config {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_missing_fields() {
        let config: HttpTransportConfig = serde_json::from_str(r#"{ "timeout_secs": 5 }"#).unwrap();

        assert_eq!(config.base_url, "http://localhost:5984");
        assert_eq!(config.timeout_secs, 5);
        assert!(config.user_agent.starts_with("couchlayer/"));
        assert!(!config.accept_invalid_certs);
        assert_eq!(HttpTransportConfig::default().timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("couchlayer-http-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "base_url": "https://db.example.com", "accept_invalid_certs": true }"#).unwrap();

        let config = HttpTransportConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.base_url, "https://db.example.com");
        assert!(config.accept_invalid_certs);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_missing_file() {
        let err = HttpTransportConfig::load("/nonexistent/couchlayer.json").unwrap_err();

        assert!(matches!(err, CouchError::Initialization(_)));
    }
}
