//! The storage trait the verification services and portal flows depend on.

use chrono::{DateTime, Utc};

use crate::types::*;
use crate::StoreError;

/// Backend-agnostic persistence operations.
///
/// Multi-entity rejection cascades (`fail_ao_link_and_reject_organization`,
/// `reject_sanctioned_ao`, `reject_organization_cascade`) must be atomic: a
/// partial cascade may not be observable after a failed call.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────── Users ─────────────────────────────────

    async fn create_user(&self, params: &CreateUserParams) -> Result<User, StoreError>;

    async fn get_user(&self, id: &UserId) -> Result<User, StoreError>;

    /// Look up a user by identity-provider subject.
    async fn find_user_by_uid(&self, uid: &str) -> Result<Option<User>, StoreError>;

    /// Set the PECOS identifier if the user does not already have one. An
    /// existing `pac_id` is never overwritten.
    async fn set_user_pac_id(&self, id: &UserId, pac_id: &str) -> Result<(), StoreError>;

    async fn approve_user(&self, id: &UserId) -> Result<(), StoreError>;

    async fn touch_user_checked(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), StoreError>;

    // ───────────────────────────── Organizations ─────────────────────────────

    async fn create_organization(
        &self,
        params: &CreateOrganizationParams,
    ) -> Result<ProviderOrganization, StoreError>;

    async fn get_organization(
        &self,
        id: &ProviderOrganizationId,
    ) -> Result<ProviderOrganization, StoreError>;

    async fn find_organization_by_npi(
        &self,
        npi: &str,
    ) -> Result<Option<ProviderOrganization>, StoreError>;

    async fn approve_organization(
        &self,
        id: &ProviderOrganizationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Approved organizations whose last check is at or before `cutoff`,
    /// oldest first, at most `limit`.
    async fn organizations_to_verify(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ProviderOrganization>, StoreError>;

    async fn touch_organization_checked(
        &self,
        id: &ProviderOrganizationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically reject the organization and every currently-approved AO link
    /// under it with the same reason.
    async fn reject_organization_cascade(
        &self,
        id: &ProviderOrganizationId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn accept_terms_of_service(
        &self,
        id: &ProviderOrganizationId,
        by: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // ────────────────────────────── Invitations ──────────────────────────────

    async fn create_invitation(
        &self,
        params: &CreateInvitationParams,
    ) -> Result<Invitation, StoreError>;

    async fn get_invitation(&self, id: &InvitationId) -> Result<Invitation, StoreError>;

    /// True when a pending credential-delegate invitation with the same
    /// invitee identity already exists for the organization.
    async fn pending_cd_invitation_exists(
        &self,
        organization: &ProviderOrganizationId,
        given_name: &str,
        family_name: &str,
        email: &str,
    ) -> Result<bool, StoreError>;

    /// Mark accepted and clear all invitee PII.
    async fn accept_invitation(&self, id: &InvitationId) -> Result<(), StoreError>;

    /// Cancel a pending invitation. Returns `Conflict` for any other status;
    /// an accepted invitation can never become cancelled.
    async fn cancel_invitation(&self, id: &InvitationId) -> Result<(), StoreError>;

    async fn mark_invitation_renewed(&self, id: &InvitationId) -> Result<(), StoreError>;

    /// Increment and return the failed one-time-code attempt counter.
    async fn record_failed_attempt(&self, id: &InvitationId) -> Result<i32, StoreError>;

    // ─────────────────────────────── AO links ────────────────────────────────

    /// Returns `AlreadyExists` when the (user, organization) pair is taken.
    async fn create_ao_link(&self, params: &CreateAoOrgLinkParams) -> Result<AoOrgLink, StoreError>;

    async fn get_ao_link(&self, id: &AoOrgLinkId) -> Result<AoOrgLink, StoreError>;

    async fn find_ao_link(
        &self,
        user: &UserId,
        organization: &ProviderOrganizationId,
    ) -> Result<Option<AoOrgLink>, StoreError>;

    async fn ao_links_for_user(&self, user: &UserId) -> Result<Vec<AoOrgLink>, StoreError>;

    /// Approved links whose last check is at or before `cutoff`, oldest first,
    /// at most `limit`.
    async fn ao_links_to_verify(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<AoOrgLink>, StoreError>;

    async fn touch_ao_link_checked(
        &self,
        id: &AoOrgLinkId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Record a failed verdict on the link alone.
    async fn fail_ao_link(
        &self,
        id: &AoOrgLinkId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically record a failed verdict on the link and reject its
    /// organization. Other links under the organization are left alone.
    async fn fail_ao_link_and_reject_organization(
        &self,
        id: &AoOrgLinkId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically reject a personally-sanctioned user: the user record, every
    /// currently-approved AO link they hold, and each such link's organization
    /// all take the same reason.
    async fn reject_sanctioned_ao(
        &self,
        user: &UserId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // ─────────────────────────────── CD links ────────────────────────────────

    async fn create_cd_link(&self, params: &CreateCdOrgLinkParams) -> Result<CdOrgLink, StoreError>;

    /// True when a non-disabled CD link whose user matches the given identity
    /// (given name, family name, email) exists for the organization.
    async fn active_cd_link_exists(
        &self,
        organization: &ProviderOrganizationId,
        given_name: &str,
        family_name: &str,
        email: &str,
    ) -> Result<bool, StoreError>;

    async fn cd_links_for_organization(
        &self,
        organization: &ProviderOrganizationId,
    ) -> Result<Vec<CdOrgLink>, StoreError>;

    async fn disable_cd_link(&self, id: &CdOrgLinkId, at: DateTime<Utc>)
        -> Result<(), StoreError>;
}
