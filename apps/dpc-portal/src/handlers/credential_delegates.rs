//! Credential-delegate invitation creation.

use thiserror::Error;

use dpc_storage::{
    CreateInvitationParams, Invitation, InvitationType, ProviderOrganizationId, Store, StoreError,
    UserId, ValidationError,
};

use crate::email::{generate_verification_code, EmailError, Mailer};

#[derive(Debug, Error)]
pub enum CdInvitationError {
    #[error("invitation attributes failed validation")]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Email(#[from] EmailError),
}

pub struct CdInvitationService<'a, S> {
    store: &'a S,
    mailer: Option<&'a Mailer>,
}

impl<'a, S: Store> CdInvitationService<'a, S> {
    pub fn new(store: &'a S, mailer: Option<&'a Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Validate, reject duplicates, persist the invitation with a fresh
    /// one-time code, and mail it to the invitee.
    pub async fn create(
        &self,
        organization: &ProviderOrganizationId,
        invited_by: &UserId,
        attributes: &dpc_storage::InvitationAttributes,
    ) -> Result<Invitation, CdInvitationError> {
        attributes.validate().map_err(CdInvitationError::Validation)?;

        let duplicate_invitation = self
            .store
            .pending_cd_invitation_exists(
                organization,
                &attributes.invited_given_name,
                &attributes.invited_family_name,
                &attributes.invited_email,
            )
            .await?;
        let existing_delegate = self
            .store
            .active_cd_link_exists(
                organization,
                &attributes.invited_given_name,
                &attributes.invited_family_name,
                &attributes.invited_email,
            )
            .await?;
        if duplicate_invitation || existing_delegate {
            return Err(CdInvitationError::Validation(vec![ValidationError {
                field: "base",
                message: "has already been invited or registered",
            }]));
        }

        let organization = self.store.get_organization(organization).await?;
        let code = generate_verification_code();
        let invitation = self
            .store
            .create_invitation(&CreateInvitationParams {
                invitation_type: InvitationType::CredentialDelegate,
                provider_organization_id: organization.id.clone(),
                invited_by: Some(invited_by.clone()),
                invited_given_name: attributes.invited_given_name.clone(),
                invited_family_name: attributes.invited_family_name.clone(),
                invited_phone: attributes.normalized_phone(),
                invited_email: attributes.invited_email.clone(),
                verification_code: Some(code.clone()),
                created_at: None,
            })
            .await?;

        if let Some(mailer) = self.mailer {
            let name = organization.name.as_deref().unwrap_or(&organization.npi);
            mailer.send_cd_invitation(&invitation.invited_email, name, &code).await?;
        } else {
            tracing::warn!("email provider not configured; skipping invitation email");
        }

        tracing::info!(
            invitation = %invitation.id.0,
            organization = %organization.id.0,
            "credential delegate invited"
        );
        Ok(invitation)
    }
}
