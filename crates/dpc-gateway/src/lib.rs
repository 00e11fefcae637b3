//! Client for the CPI API Gateway.
//!
//! Authenticates once via the OAuth2 client-credentials grant against the
//! configured identity-management token endpoint, caches the access token per
//! client instance, and re-authenticates transparently when it expires.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

pub mod config;
mod types;

pub use config::{ConfigError, GatewayConfig};
pub use types::{
    Enrollment, EnrollmentRole, MedSanction, ProviderInfo, ProviderProfile, Waiver,
    AUTHORIZED_OFFICIAL_ROLE_CODE, NOT_FOUND_CODE,
};

/// Transport-level failure talking to the gateway or its token endpoint.
///
/// Domain outcomes (unknown NPI, sanctions) are not errors here; they arrive
/// in the response bodies and are interpreted by the verification service.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway returned HTTP {status}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed token response: {0}")]
    Token(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Seam for the verification service and batch jobs; implemented by
/// [`CpiApiGatewayClient`] in production and by canned fixtures in tests.
#[async_trait::async_trait]
pub trait CpiGateway: Send + Sync {
    /// Provider-identity lookup keyed by organization NPI. Unknown NPIs come
    /// back as `code: "404"` in the body, not as an HTTP error.
    async fn fetch_profile(&self, npi: &str) -> Result<ProviderProfile, GatewayError>;

    /// Individual sanctions/waiver lookup by SSN.
    async fn fetch_med_sanctions_and_waivers_by_ssn(
        &self,
        ssn: &str,
    ) -> Result<ProviderInfo, GatewayError>;

    /// Organization-level provider info lookup.
    async fn org_info(&self, npi: &str) -> Result<ProviderInfo, GatewayError>;
}

#[async_trait::async_trait]
impl<T: CpiGateway + ?Sized> CpiGateway for &T {
    async fn fetch_profile(&self, npi: &str) -> Result<ProviderProfile, GatewayError> {
        (**self).fetch_profile(npi).await
    }

    async fn fetch_med_sanctions_and_waivers_by_ssn(
        &self,
        ssn: &str,
    ) -> Result<ProviderInfo, GatewayError> {
        (**self).fetch_med_sanctions_and_waivers_by_ssn(ssn).await
    }

    async fn org_info(&self, npi: &str) -> Result<ProviderInfo, GatewayError> {
        (**self).org_info(npi).await
    }
}

#[async_trait::async_trait]
impl<T: CpiGateway + ?Sized> CpiGateway for std::sync::Arc<T> {
    async fn fetch_profile(&self, npi: &str) -> Result<ProviderProfile, GatewayError> {
        (**self).fetch_profile(npi).await
    }

    async fn fetch_med_sanctions_and_waivers_by_ssn(
        &self,
        ssn: &str,
    ) -> Result<ProviderInfo, GatewayError> {
        (**self).fetch_med_sanctions_and_waivers_by_ssn(ssn).await
    }

    async fn org_info(&self, npi: &str) -> Result<ProviderInfo, GatewayError> {
        (**self).org_info(npi).await
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Refresh the token this long before its stated expiry.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

pub struct CpiApiGatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
    token: Mutex<Option<CachedToken>>,
}

impl CpiApiGatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    /// Attempts to obtain a token; OAuth failures come back as `false`.
    pub async fn healthcheck(&self) -> bool {
        match self.access_token().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "CPI API gateway healthcheck failed");
                false
            }
        }
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(TOKEN_EXPIRY_SKEW_SECS) {
                return Ok(token.value.clone());
            }
        }

        let started = Instant::now();
        tracing::info!(url = %self.config.oauth_url, "requesting CPI API gateway token");
        let response = self
            .http
            .post(&self.config.oauth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", "READ"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        tracing::info!(
            url = %self.config.oauth_url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "CPI API gateway token response"
        );
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http { status: status.as_u16(), body });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Token(e.to_string()))?;
        let expires_in = token.expires_in.unwrap_or(300);
        let value = token.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        });
        Ok(value)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let token = self.access_token().await?;
        let url = self.endpoint(path);

        let started = Instant::now();
        tracing::info!(%url, "calling CPI API gateway");
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        tracing::info!(
            %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "CPI API gateway response"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http { status: status.as_u16(), body });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl CpiGateway for CpiApiGatewayClient {
    async fn fetch_profile(&self, npi: &str) -> Result<ProviderProfile, GatewayError> {
        self.post(
            "api/1.0/ppr/providers/profile",
            json!({ "providerID": { "npi": npi } }),
        )
        .await
    }

    async fn fetch_med_sanctions_and_waivers_by_ssn(
        &self,
        ssn: &str,
    ) -> Result<ProviderInfo, GatewayError> {
        self.post(
            "api/1.0/ppr/providers",
            json!({
                "providerID": {
                    "providerType": "ind",
                    "identity": { "idType": "ssn", "id": ssn }
                },
                "dataSets": { "subjectAreas": { "all": true } }
            }),
        )
        .await
    }

    async fn org_info(&self, npi: &str) -> Result<ProviderInfo, GatewayError> {
        self.post(
            "api/1.0/ppr/providers",
            json!({
                "providerID": { "npi": npi },
                "dataSets": { "subjectAreas": { "all": true } }
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url_with_and_without_trailing_slash() {
        let config = GatewayConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            oauth_url: "https://idm.example.gov/token".into(),
            base_url: "https://cpi.example.gov/".into(),
        };
        let client = CpiApiGatewayClient::new(config);
        assert_eq!(
            client.endpoint("api/1.0/ppr/providers/profile"),
            "https://cpi.example.gov/api/1.0/ppr/providers/profile"
        );

        let config = GatewayConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            oauth_url: "https://idm.example.gov/token".into(),
            base_url: "https://cpi.example.gov".into(),
        };
        let client = CpiApiGatewayClient::new(config);
        assert_eq!(
            client.endpoint("api/1.0/ppr/providers"),
            "https://cpi.example.gov/api/1.0/ppr/providers"
        );
    }

    #[test]
    fn http_error_exposes_status() {
        let err = GatewayError::Http { status: 500, body: String::new() };
        assert_eq!(err.status(), Some(500));
        let err = GatewayError::Token("bad".into());
        assert_eq!(err.status(), None);
    }
}
