//! Portal configuration.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! # Provider: Resend
//! DPC_EMAIL_PROVIDER=resend
//! RESEND_API_KEY=re_...
//!
//! # Provider: SMTP
//! DPC_EMAIL_PROVIDER=smtp
//! SMTP_HOST=smtp.example.gov
//! SMTP_PORT=587
//! SMTP_USERNAME=portal@example.gov
//! SMTP_PASSWORD=app_password
//! SMTP_USE_TLS=true
//!
//! # Sender config
//! DPC_EMAIL_FROM=noreply@dpc.example.gov
//! DPC_EMAIL_FROM_NAME="DPC Portal"
//! ```
//!
//! The gateway's own variables are read by `dpc_gateway::GatewayConfig`.

use std::env;
use thiserror::Error;

/// Portal configuration
#[derive(Debug, Clone, Default)]
pub struct PortalConfig {
    pub email: Option<EmailConfig>,
}

/// Email configuration for invitation delivery
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProviderConfig,
    pub from_address: String,
    pub from_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Resend {
        #[allow(dead_code)] // Used when the email-resend feature is enabled
        api_key: String,
    },
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid email provider: {0}. Expected 'resend' or 'smtp'")]
    InvalidProvider(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Missing from address: DPC_EMAIL_FROM is required when email is configured")]
    MissingFromAddress,

    #[error("SMTP provider requires SMTP_HOST")]
    SmtpMissingHost,
}

impl PortalConfig {
    /// Load configuration from environment variables. With no provider
    /// configured, invitation emails are logged and skipped.
    pub fn from_env() -> Result<Self, ConfigError> {
        let Some(provider_type) = env::var("DPC_EMAIL_PROVIDER").ok() else {
            return Ok(Self { email: None });
        };

        let provider = match provider_type.to_lowercase().as_str() {
            "resend" => {
                let api_key = env::var("RESEND_API_KEY")
                    .map_err(|_| ConfigError::MissingEnvVar("RESEND_API_KEY".to_string()))?;
                EmailProviderConfig::Resend { api_key }
            }
            "smtp" => {
                let host = env::var("SMTP_HOST").map_err(|_| ConfigError::SmtpMissingHost)?;
                let port_raw = env::var("SMTP_PORT").unwrap_or_else(|_| "587".to_string());
                let port = port_raw
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(port_raw.clone()))?;
                let username = env::var("SMTP_USERNAME").ok();
                let password = env::var("SMTP_PASSWORD").ok();
                let use_tls = env::var("SMTP_USE_TLS")
                    .map(|v| v.to_lowercase() == "true" || v == "1")
                    .unwrap_or(true);

                EmailProviderConfig::Smtp { host, port, username, password, use_tls }
            }
            other => return Err(ConfigError::InvalidProvider(other.to_string())),
        };

        let from_address =
            env::var("DPC_EMAIL_FROM").map_err(|_| ConfigError::MissingFromAddress)?;
        let from_name = env::var("DPC_EMAIL_FROM_NAME").ok();

        Ok(Self {
            email: Some(EmailConfig { provider, from_address, from_name }),
        })
    }
}
