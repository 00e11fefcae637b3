//! Entity types shared across storage backends and services.

mod ids;
mod invitations;
mod links;
mod organizations;
mod users;
mod verification;

pub use ids::{AoOrgLinkId, CdOrgLinkId, InvitationId, ProviderOrganizationId, UserId};
pub use invitations::{
    CreateInvitationParams, Invitation, InvitationAttributes, InvitationStatus, InvitationType,
    UnacceptableReason, ValidationError, INVITATION_TTL_HOURS,
};
pub use links::{AoOrgLink, CdOrgLink, CreateAoOrgLinkParams, CreateCdOrgLinkParams};
pub use organizations::{CreateOrganizationParams, ProviderOrganization};
pub use users::{CreateUserParams, User};
pub use verification::{VerificationReason, VerificationStatus};
