//! User types.

use chrono::{DateTime, Utc};

use super::{UserId, VerificationReason, VerificationStatus};

/// Local account for a person authenticated through the external identity
/// provider. `pac_id` is the PECOS identifier used for recurring AO
/// re-verification; it is set at registration and never overwritten.
#[derive(Clone, Debug)]
pub struct User {
    pub id: UserId,
    /// Identity-provider subject (`sub` claim).
    pub uid: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub pac_id: Option<String>,
    pub verification_status: VerificationStatus,
    pub verification_reason: Option<VerificationReason>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CreateUserParams {
    pub uid: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub pac_id: Option<String>,
}
