//! Acceptance flow for invitations: accept, confirm, register, renew, cancel.

use chrono::Utc;
use thiserror::Error;

use dpc_gateway::CpiGateway;
use dpc_storage::{
    AoOrgLink, CdOrgLink, CreateAoOrgLinkParams, CreateCdOrgLinkParams, CreateInvitationParams,
    Invitation, InvitationId, InvitationType, ProviderOrganization, ProviderOrganizationId, Store,
    StoreError, UnacceptableReason, User,
};
use dpc_verification::{
    cd_match, email_match, hashed_ssn, phone_match, AoVerificationService, EligibilityFailure,
    EligibilityResult, GatewayFailure, UserInfo, UserInfoError,
};

use crate::email::{EmailError, Mailer};

/// Where an invitee is in the acceptance flow. The caller keeps one of these
/// per invitation, the way a web session would.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowStage {
    #[default]
    Unstarted,
    IdentityVerified,
    ConditionsVerified,
}

#[derive(Clone, Debug, Default)]
pub struct FlowSession {
    pub stage: FlowStage,
    /// PAC ID of the matched AO role, stashed at confirmation and applied to
    /// the user at registration.
    pub pac_id: Option<String>,
}

impl FlowSession {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invitation not found")]
    NotFound,
    #[error("invitation cannot be accepted: {}", .0.as_str())]
    Unacceptable(UnacceptableReason),
    #[error("identity does not match invitation")]
    IdentityMismatch,
    #[error("missing_info")]
    MissingInfo,
    #[error("verification code does not match")]
    CodeMismatch,
    #[error("flow step out of order")]
    StepOutOfOrder,
    #[error("{}", .0.as_str())]
    Ineligible(EligibilityFailure),
    #[error("{}", .0.as_str())]
    GatewayUnavailable(GatewayFailure),
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FlowError {
    /// Reason key a view layer routes on. Gateway failures share the generic
    /// server-error display; domain reasons get specific guidance text.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Unacceptable(reason) => Some(reason.as_str()),
            Self::Ineligible(failure) => Some(failure.as_str()),
            Self::GatewayUnavailable(failure) => Some(failure.as_str()),
            Self::MissingInfo => Some("missing_info"),
            _ => None,
        }
    }

    pub fn server_error(&self) -> bool {
        matches!(
            self,
            Self::GatewayUnavailable(_) | Self::Email(_) | Self::Store(_)
        )
    }
}

impl From<UserInfoError> for FlowError {
    fn from(_: UserInfoError) -> Self {
        Self::MissingInfo
    }
}

/// What registration produced.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub ao_link: Option<AoOrgLink>,
    pub cd_link: Option<CdOrgLink>,
}

pub struct InvitationFlows<'a, S, G> {
    store: &'a S,
    verification: &'a AoVerificationService<G>,
    mailer: Option<&'a Mailer>,
}

impl<'a, S: Store, G: CpiGateway> InvitationFlows<'a, S, G> {
    pub fn new(
        store: &'a S,
        verification: &'a AoVerificationService<G>,
        mailer: Option<&'a Mailer>,
    ) -> Self {
        Self { store, verification, mailer }
    }

    async fn load(
        &self,
        organization: &ProviderOrganizationId,
        invitation: &InvitationId,
    ) -> Result<(Invitation, ProviderOrganization), FlowError> {
        let invitation = match self.store.get_invitation(invitation).await {
            Ok(invitation) => invitation,
            Err(StoreError::NotFound) => return Err(FlowError::NotFound),
            Err(e) => return Err(e.into()),
        };
        // An invitation reached through the wrong organization is treated as
        // missing, not as forbidden.
        if invitation.provider_organization_id != *organization {
            return Err(FlowError::NotFound);
        }
        let organization = self.store.get_organization(organization).await?;
        Ok((invitation, organization))
    }

    fn ensure_acceptable(invitation: &Invitation) -> Result<(), FlowError> {
        match invitation.unacceptable_reason(Utc::now()) {
            Some(reason) => Err(FlowError::Unacceptable(reason)),
            None => Ok(()),
        }
    }

    /// The landing view: the invitation, if it can still be accepted.
    pub async fn show(
        &self,
        organization: &ProviderOrganizationId,
        invitation: &InvitationId,
    ) -> Result<Invitation, FlowError> {
        let (invitation, _) = self.load(organization, invitation).await?;
        Self::ensure_acceptable(&invitation)?;
        Ok(invitation)
    }

    /// Step one: the invitee has authenticated; verify the identity payload
    /// matches the invitation.
    pub async fn accept(
        &self,
        organization: &ProviderOrganizationId,
        invitation: &InvitationId,
        user_info: &UserInfo,
        session: &mut FlowSession,
    ) -> Result<Invitation, FlowError> {
        let (invitation, _) = self.load(organization, invitation).await?;
        Self::ensure_acceptable(&invitation)?;

        if !email_match(&invitation, user_info)? {
            return Err(FlowError::IdentityMismatch);
        }
        if invitation.credential_delegate() {
            if !cd_match(&invitation, user_info)? {
                return Err(FlowError::IdentityMismatch);
            }
            if !phone_match(&invitation, user_info) {
                return Err(FlowError::IdentityMismatch);
            }
        }

        session.stage = FlowStage::IdentityVerified;
        Ok(invitation)
    }

    /// Step two: AO invitees pass the eligibility check; CD invitees supply
    /// the one-time code from their invitation email.
    pub async fn confirm(
        &self,
        organization: &ProviderOrganizationId,
        invitation: &InvitationId,
        user_info: &UserInfo,
        verification_code: Option<&str>,
        session: &mut FlowSession,
    ) -> Result<(), FlowError> {
        let (invitation, organization) = self.load(organization, invitation).await?;
        Self::ensure_acceptable(&invitation)?;
        if session.stage == FlowStage::Unstarted {
            return Err(FlowError::StepOutOfOrder);
        }

        if invitation.authorized_official() {
            let hashed = hashed_ssn(user_info)?;
            match self.verification.check_eligibility(&organization.npi, &hashed).await {
                EligibilityResult::Approved { ao_role } => {
                    session.pac_id = ao_role.pac_id;
                }
                EligibilityResult::Ineligible(failure) => {
                    return Err(FlowError::Ineligible(failure));
                }
                EligibilityResult::Unavailable(failure) => {
                    return Err(FlowError::GatewayUnavailable(failure));
                }
            }
        } else {
            let supplied = verification_code.unwrap_or_default();
            let matches =
                invitation.verification_code.as_deref().is_some_and(|code| code == supplied);
            if !matches {
                self.store.record_failed_attempt(&invitation.id).await?;
                return Err(FlowError::CodeMismatch);
            }
        }

        session.stage = FlowStage::ConditionsVerified;
        Ok(())
    }

    /// Final step: create the credential link, mark the invitation accepted
    /// (clearing its PII), and drop the flow state.
    pub async fn register(
        &self,
        organization: &ProviderOrganizationId,
        invitation: &InvitationId,
        user_info: &UserInfo,
        session: &mut FlowSession,
    ) -> Result<Registration, FlowError> {
        let (invitation, organization) = self.load(organization, invitation).await?;
        Self::ensure_acceptable(&invitation)?;
        if session.stage != FlowStage::ConditionsVerified {
            return Err(FlowError::StepOutOfOrder);
        }

        let user = match self.store.find_user_by_uid(&user_info.sub).await? {
            Some(user) => user,
            None => {
                self.store
                    .create_user(&dpc_storage::CreateUserParams {
                        uid: user_info.sub.clone(),
                        email: user_info.email.clone().unwrap_or_default(),
                        given_name: user_info.given_name.clone().unwrap_or_default(),
                        family_name: user_info.family_name.clone().unwrap_or_default(),
                        pac_id: None,
                    })
                    .await?
            }
        };

        let now = Utc::now();
        let registration = if invitation.authorized_official() {
            if let Some(pac_id) = session.pac_id.as_deref() {
                self.store.set_user_pac_id(&user.id, pac_id).await?;
            }
            let link = self
                .store
                .create_ao_link(&CreateAoOrgLinkParams {
                    user_id: user.id.clone(),
                    provider_organization_id: organization.id.clone(),
                    invitation_id: Some(invitation.id.clone()),
                })
                .await?;
            self.store.approve_user(&user.id).await?;
            self.store.touch_user_checked(&user.id, now).await?;
            self.store.approve_organization(&organization.id, now).await?;
            Registration {
                user: self.store.get_user(&user.id).await?,
                ao_link: Some(link),
                cd_link: None,
            }
        } else {
            let link = self
                .store
                .create_cd_link(&CreateCdOrgLinkParams {
                    user_id: user.id.clone(),
                    provider_organization_id: organization.id.clone(),
                    invitation_id: invitation.id.clone(),
                })
                .await?;
            Registration { user, ao_link: None, cd_link: Some(link) }
        };

        self.store.accept_invitation(&invitation.id).await?;
        tracing::info!(
            invitation = %invitation.id.0,
            invitation_type = invitation.invitation_type.as_str(),
            "invitation registered"
        );
        session.reset();
        Ok(registration)
    }

    /// Spawn a replacement for a pending, expired AO invitation. Anything
    /// else is a no-op returning `None`.
    pub async fn renew(
        &self,
        organization: &ProviderOrganizationId,
        invitation: &InvitationId,
    ) -> Result<Option<Invitation>, FlowError> {
        let (invitation, organization) = self.load(organization, invitation).await?;
        if !invitation.renewable(Utc::now()) {
            return Ok(None);
        }

        let replacement = self
            .store
            .create_invitation(&CreateInvitationParams {
                invitation_type: InvitationType::AuthorizedOfficial,
                provider_organization_id: organization.id.clone(),
                invited_by: invitation.invited_by.clone(),
                invited_given_name: String::new(),
                invited_family_name: String::new(),
                invited_phone: String::new(),
                invited_email: invitation.invited_email.clone(),
                verification_code: None,
                created_at: None,
            })
            .await?;

        self.send_ao_invitation_email(&invitation.invited_email, &organization).await?;
        self.store.mark_invitation_renewed(&invitation.id).await?;
        tracing::info!(
            original = %invitation.id.0,
            replacement = %replacement.id.0,
            "authorized official invitation renewed"
        );
        Ok(Some(replacement))
    }

    /// An AO withdrawing a pending credential-delegate invitation.
    pub async fn cancel_cd_invitation(
        &self,
        organization: &ProviderOrganizationId,
        invitation: &InvitationId,
    ) -> Result<(), FlowError> {
        let (invitation, _) = self.load(organization, invitation).await?;
        if !invitation.credential_delegate() {
            return Err(FlowError::NotFound);
        }
        self.store.cancel_invitation(&invitation.id).await?;
        Ok(())
    }

    async fn send_ao_invitation_email(
        &self,
        to: &str,
        organization: &ProviderOrganization,
    ) -> Result<(), EmailError> {
        let Some(mailer) = self.mailer else {
            tracing::warn!("email provider not configured; skipping invitation email");
            return Ok(());
        };
        let name = organization.name.as_deref().unwrap_or(&organization.npi);
        mailer.send_ao_invitation(to, name).await
    }
}
