//! Email module for invitation delivery.

mod code;
#[cfg(feature = "email-resend")]
mod resend;
#[cfg(feature = "email-smtp")]
mod smtp;
mod templates;

pub use code::generate_verification_code;
pub use templates::InvitationEmailContent;

use crate::config::{EmailConfig, EmailProviderConfig};
use async_trait::async_trait;
use thiserror::Error;

/// Email sending error
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Trait for email providers
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(
        &self,
        to: &str,
        content: &InvitationEmailContent,
        from_address: &str,
        from_name: Option<&str>,
    ) -> Result<(), EmailError>;
}

/// Create an email provider from configuration
pub fn create_provider(config: &EmailConfig) -> Result<Box<dyn EmailProvider>, EmailError> {
    match &config.provider {
        #[cfg(feature = "email-resend")]
        EmailProviderConfig::Resend { api_key } => {
            Ok(Box::new(resend::ResendProvider::new(api_key.clone())))
        }
        #[cfg(not(feature = "email-resend"))]
        EmailProviderConfig::Resend { .. } => Err(EmailError::ProviderNotAvailable(
            "Resend support not compiled in. Enable the 'email-resend' feature.".to_string(),
        )),
        #[cfg(feature = "email-smtp")]
        EmailProviderConfig::Smtp { host, port, username, password, use_tls } => {
            let provider = smtp::SmtpProvider::new(
                host.clone(),
                *port,
                username.clone(),
                password.clone(),
                *use_tls,
            )?;
            Ok(Box::new(provider))
        }
        #[cfg(not(feature = "email-smtp"))]
        EmailProviderConfig::Smtp { .. } => Err(EmailError::ProviderNotAvailable(
            "SMTP support not compiled in. Enable the 'email-smtp' feature.".to_string(),
        )),
    }
}

/// A configured provider plus sender identity; what the flows hold.
pub struct Mailer {
    provider: Box<dyn EmailProvider>,
    from_address: String,
    from_name: Option<String>,
}

impl Mailer {
    pub fn new(
        provider: Box<dyn EmailProvider>,
        from_address: String,
        from_name: Option<String>,
    ) -> Self {
        Self { provider, from_address, from_name }
    }

    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        Ok(Self::new(
            create_provider(config)?,
            config.from_address.clone(),
            config.from_name.clone(),
        ))
    }

    pub async fn send_ao_invitation(
        &self,
        to: &str,
        organization_name: &str,
    ) -> Result<(), EmailError> {
        let content = InvitationEmailContent::ao_invitation(organization_name);
        self.provider
            .send(to, &content, &self.from_address, self.from_name.as_deref())
            .await
    }

    pub async fn send_cd_invitation(
        &self,
        to: &str,
        organization_name: &str,
        verification_code: &str,
    ) -> Result<(), EmailError> {
        let content = InvitationEmailContent::cd_invitation(organization_name, verification_code);
        self.provider
            .send(to, &content, &self.from_address, self.from_name.as_deref())
            .await
    }
}
