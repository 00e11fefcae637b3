//! Provider organization types.

use chrono::{DateTime, Utc};

use super::{ProviderOrganizationId, UserId, VerificationReason, VerificationStatus};

/// Local mirror of an organization recognized by the DPC API.
#[derive(Clone, Debug)]
pub struct ProviderOrganization {
    pub id: ProviderOrganizationId,
    /// National Provider Identifier. Required and unique.
    pub npi: String,
    pub name: Option<String>,
    pub dpc_api_organization_id: Option<String>,
    pub verification_status: VerificationStatus,
    pub verification_reason: Option<VerificationReason>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub terms_of_service_accepted_at: Option<DateTime<Utc>>,
    pub terms_of_service_accepted_by: Option<UserId>,
    pub config_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CreateOrganizationParams {
    pub npi: String,
    pub name: Option<String>,
}
