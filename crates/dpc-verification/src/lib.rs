//! Authorized Official verification: eligibility checks against the CPI API
//! Gateway, identity matching for invitation acceptance, and the periodic
//! re-verification jobs that degrade access when standing lapses.

mod eligibility;
mod jobs;
pub mod testing;
mod user_info;

pub use eligibility::{
    AoIdentifier, AoVerificationService, EligibilityError, EligibilityFailure, EligibilityResult,
    GatewayFailure,
};
pub use jobs::{JobError, VerificationSettings, VerifyAoJob, VerifyProviderOrganizationJob};
pub use user_info::{cd_match, email_match, hashed_ssn, phone_match, UserInfo, UserInfoError};
