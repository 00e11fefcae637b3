//! Credential-link types: the authorization relationship between a user and
//! an organization.

use chrono::{DateTime, Utc};

use super::{
    AoOrgLinkId, CdOrgLinkId, InvitationId, ProviderOrganizationId, UserId, VerificationReason,
    VerificationStatus,
};

/// A validated Authorized-Official-to-organization relationship.
///
/// Unique per (user, organization). Batch verification flips the status to
/// rejected with a reason on failure; a rejected link is never automatically
/// restored.
#[derive(Clone, Debug)]
pub struct AoOrgLink {
    pub id: AoOrgLinkId,
    pub user_id: UserId,
    pub provider_organization_id: ProviderOrganizationId,
    pub invitation_id: Option<InvitationId>,
    pub verification_status: VerificationStatus,
    pub verification_reason: Option<VerificationReason>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CreateAoOrgLinkParams {
    pub user_id: UserId,
    pub provider_organization_id: ProviderOrganizationId,
    pub invitation_id: Option<InvitationId>,
}

/// A validated Credential-Delegate-to-organization relationship. Every CD link
/// traces to the invitation that created it. Deleted by setting `disabled_at`,
/// never hard-deleted while referenced.
#[derive(Clone, Debug)]
pub struct CdOrgLink {
    pub id: CdOrgLinkId,
    pub user_id: UserId,
    pub provider_organization_id: ProviderOrganizationId,
    pub invitation_id: InvitationId,
    pub disabled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CdOrgLink {
    pub fn disabled(&self) -> bool {
        self.disabled_at.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct CreateCdOrgLinkParams {
    pub user_id: UserId,
    pub provider_organization_id: ProviderOrganizationId,
    pub invitation_id: InvitationId,
}
