//! Hosted backend connection configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the hosted data/auth/function backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the backend project (no trailing slash).
    #[serde(default = "default_url")]
    pub url: String,
    /// Public API key sent with every request.
    #[serde(default)]
    pub api_key: String,
    /// Access token of the signed-in user, if any.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Database schema exposed by the REST endpoint.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: String::new(),
            access_token: None,
            schema: default_schema(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_request_timeout() -> u64 {
    15
}
