//! Gateway configuration.
//!
//! Loaded from environment variables:
//!
//! ```bash
//! CPI_API_GW_CLIENT_ID=...      # OAuth2 client id
//! CPI_API_GW_CLIENT_SECRET=...  # OAuth2 client secret
//! CMS_IDM_OAUTH_URL=https://idm.example.gov/oauth2/default/v1/token
//! CPI_API_GW_BASE_URL=https://cpi.example.gov/
//! ```

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub client_id: String,
    pub client_secret: String,
    /// OAuth2 client-credentials token endpoint.
    pub oauth_url: String,
    /// Base URL for the gateway's provider endpoints.
    pub base_url: String,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: require("CPI_API_GW_CLIENT_ID")?,
            client_secret: require("CPI_API_GW_CLIENT_SECRET")?,
            oauth_url: require("CMS_IDM_OAUTH_URL")?,
            base_url: require("CPI_API_GW_BASE_URL")?,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name))
}
