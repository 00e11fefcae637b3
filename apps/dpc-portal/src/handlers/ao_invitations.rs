//! Authorized Official invitations, created from an organization NPI lookup.

use thiserror::Error;

use dpc_gateway::{CpiGateway, GatewayError};
use dpc_storage::{
    CreateInvitationParams, CreateOrganizationParams, Invitation, InvitationAttributes,
    InvitationType, Store, StoreError, ValidationError,
};

use crate::email::{EmailError, Mailer};

#[derive(Debug, Error)]
pub enum AoInvitationError {
    #[error("organization NPI not recognized by the gateway")]
    UnknownNpi,
    #[error("invitation attributes failed validation")]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Email(#[from] EmailError),
}

pub struct AoInvitationService<'a, S, G> {
    store: &'a S,
    gateway: &'a G,
    mailer: Option<&'a Mailer>,
}

impl<'a, S: Store, G: CpiGateway> AoInvitationService<'a, S, G> {
    pub fn new(store: &'a S, gateway: &'a G, mailer: Option<&'a Mailer>) -> Self {
        Self { store, gateway, mailer }
    }

    /// Invite an Authorized Official by organization NPI. Creates the local
    /// organization mirror on first contact, looked up through the gateway.
    pub async fn invite(&self, npi: &str, email: &str) -> Result<Invitation, AoInvitationError> {
        let attributes = InvitationAttributes {
            invitation_type: Some(InvitationType::AuthorizedOfficial),
            invited_email: email.to_string(),
            invited_email_confirmation: email.to_string(),
            ..Default::default()
        };
        attributes.validate().map_err(AoInvitationError::Validation)?;

        let organization = match self.store.find_organization_by_npi(npi).await? {
            Some(organization) => organization,
            None => {
                let info = self.gateway.org_info(npi).await?;
                if info.not_found() {
                    return Err(AoInvitationError::UnknownNpi);
                }
                self.store
                    .create_organization(&CreateOrganizationParams {
                        npi: npi.to_string(),
                        name: info.provider_name,
                    })
                    .await?
            }
        };

        let invitation = self
            .store
            .create_invitation(&CreateInvitationParams {
                invitation_type: InvitationType::AuthorizedOfficial,
                provider_organization_id: organization.id.clone(),
                invited_by: None,
                invited_given_name: String::new(),
                invited_family_name: String::new(),
                invited_phone: String::new(),
                invited_email: email.to_string(),
                verification_code: None,
                created_at: None,
            })
            .await?;

        if let Some(mailer) = self.mailer {
            let name = organization.name.as_deref().unwrap_or(&organization.npi);
            mailer.send_ao_invitation(email, name).await?;
        } else {
            tracing::warn!("email provider not configured; skipping invitation email");
        }

        tracing::info!(
            invitation = %invitation.id.0,
            organization = %organization.id.0,
            "authorized official invited"
        );
        Ok(invitation)
    }
}
