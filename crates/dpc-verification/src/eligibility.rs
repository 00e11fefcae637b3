//! Eligibility checks for Authorized Officials and organization standing.

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

use dpc_gateway::{CpiGateway, Enrollment, EnrollmentRole, GatewayError};
use dpc_storage::VerificationReason;

/// A definitive, user-facing rejection from the eligibility checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EligibilityFailure {
    OrgMedSanctions,
    AoMedSanctions,
    NoApprovedEnrollment,
    BadNpi,
    UserNotAuthorizedOfficial,
}

impl EligibilityFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrgMedSanctions => "org_med_sanctions",
            Self::AoMedSanctions => "ao_med_sanctions",
            Self::NoApprovedEnrollment => "no_approved_enrollment",
            Self::BadNpi => "bad_npi",
            Self::UserNotAuthorizedOfficial => "user_not_authorized_official",
        }
    }

    pub fn verification_reason(self) -> VerificationReason {
        match self {
            Self::OrgMedSanctions => VerificationReason::OrgMedSanctions,
            Self::AoMedSanctions => VerificationReason::AoMedSanctions,
            Self::NoApprovedEnrollment => VerificationReason::NoApprovedEnrollment,
            Self::BadNpi => VerificationReason::BadNpi,
            Self::UserNotAuthorizedOfficial => VerificationReason::UserNotAuthorizedOfficial,
        }
    }
}

/// Infrastructure failure reaching the gateway, kept distinct from a
/// rejection so callers can treat it as retryable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayFailure {
    /// Gateway answered HTTP 500.
    ApiGatewayError,
    /// Gateway answered HTTP 404.
    InvalidEndpointCalled,
    /// Anything else: other statuses, connect failures, malformed bodies.
    UnexpectedError,
}

impl GatewayFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiGatewayError => "api_gateway_error",
            Self::InvalidEndpointCalled => "invalid_endpoint_called",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub fn classify(error: &GatewayError) -> Self {
        match error.status() {
            Some(500) => Self::ApiGatewayError,
            Some(404) => Self::InvalidEndpointCalled,
            _ => Self::UnexpectedError,
        }
    }
}

/// Outcome of a full eligibility check.
#[derive(Debug)]
pub enum EligibilityResult {
    /// The caller is a valid Authorized Official; the matched enrollment role
    /// carries the PAC ID used for recurring re-verification.
    Approved { ao_role: EnrollmentRole },
    Ineligible(EligibilityFailure),
    Unavailable(GatewayFailure),
}

impl EligibilityResult {
    pub fn success(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// The reason string surfaced to flow views on failure.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            Self::Approved { .. } => None,
            Self::Ineligible(failure) => Some(failure.as_str()),
            Self::Unavailable(failure) => Some(failure.as_str()),
        }
    }
}

/// Error form of the standalone checks, for `?` composition.
#[derive(Debug, Error)]
pub enum EligibilityError {
    #[error("{}", .0.as_str())]
    Ineligible(EligibilityFailure),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The identifier an Authorized Official is matched by. SSNs are compared as
/// SHA-256 digests; PAC IDs are compared plain.
#[derive(Clone, Copy, Debug)]
pub enum AoIdentifier<'a> {
    HashedSsn(&'a str),
    PacId(&'a str),
}

pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Decides whether a person is a valid Authorized Official for an
/// organization and whether the organization remains in good standing, by
/// composing the gateway checks with strict ordering and short-circuiting.
pub struct AoVerificationService<G> {
    gateway: G,
}

impl<G: CpiGateway> AoVerificationService<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Full check used at invitation acceptance: organization sanctions
    /// first, then enrollment/role resolution, then the official's personal
    /// sanctions. Never returns a raw transport error.
    pub async fn check_eligibility(
        &self,
        organization_npi: &str,
        hashed_ao_ssn: &str,
    ) -> EligibilityResult {
        let outcome = async {
            self.check_org_med_sanctions(organization_npi).await?;
            self.check_ao_eligibility(organization_npi, AoIdentifier::HashedSsn(hashed_ao_ssn))
                .await
        }
        .await;

        match outcome {
            Ok(ao_role) => EligibilityResult::Approved { ao_role },
            Err(EligibilityError::Ineligible(failure)) => EligibilityResult::Ineligible(failure),
            Err(EligibilityError::Gateway(error)) => {
                tracing::error!(error = %error, npi = organization_npi, "eligibility check could not reach gateway");
                EligibilityResult::Unavailable(GatewayFailure::classify(&error))
            }
        }
    }

    /// Resolve the caller's AO role among the organization's approved
    /// enrollments, then re-check the official's personal sanctions. Exposed
    /// standalone for periodic re-verification by PAC ID.
    pub async fn check_ao_eligibility(
        &self,
        npi: &str,
        identifier: AoIdentifier<'_>,
    ) -> Result<EnrollmentRole, EligibilityError> {
        let enrollments = self.get_approved_enrollments(npi).await?;
        let role = enrollments
            .into_iter()
            .flat_map(|e| e.roles)
            .find(|role| role.authorized_official() && identifier_matches(role, identifier))
            .ok_or(EligibilityError::Ineligible(
                EligibilityFailure::UserNotAuthorizedOfficial,
            ))?;

        if let Some(ssn) = role.ssn.as_deref() {
            self.check_provider_med_sanctions(ssn).await?;
        }
        Ok(role)
    }

    /// The organization's `APPROVED` enrollments. Exposed standalone for
    /// organization-only re-verification (no role or person check).
    pub async fn get_approved_enrollments(
        &self,
        npi: &str,
    ) -> Result<Vec<Enrollment>, EligibilityError> {
        let profile = self.gateway.fetch_profile(npi).await?;
        if profile.not_found() {
            return Err(EligibilityError::Ineligible(EligibilityFailure::BadNpi));
        }
        let approved: Vec<Enrollment> =
            profile.enrollments.into_iter().filter(Enrollment::approved).collect();
        if approved.is_empty() {
            return Err(EligibilityError::Ineligible(EligibilityFailure::NoApprovedEnrollment));
        }
        Ok(approved)
    }

    /// Rejects an organization that currently has an active, unreinstated
    /// medical sanction with no active waiver covering it.
    pub async fn check_org_med_sanctions(&self, npi: &str) -> Result<(), EligibilityError> {
        let info = self.gateway.org_info(npi).await?;
        if info.sanctioned_as_of(Utc::now().date_naive()) {
            return Err(EligibilityError::Ineligible(EligibilityFailure::OrgMedSanctions));
        }
        Ok(())
    }

    async fn check_provider_med_sanctions(&self, ssn: &str) -> Result<(), EligibilityError> {
        let info = self.gateway.fetch_med_sanctions_and_waivers_by_ssn(ssn).await?;
        if info.sanctioned_as_of(Utc::now().date_naive()) {
            return Err(EligibilityError::Ineligible(EligibilityFailure::AoMedSanctions));
        }
        Ok(())
    }
}

fn identifier_matches(role: &EnrollmentRole, identifier: AoIdentifier<'_>) -> bool {
    match identifier {
        AoIdentifier::HashedSsn(hashed) => role
            .ssn
            .as_deref()
            .is_some_and(|ssn| sha256_hex(ssn).eq_ignore_ascii_case(hashed)),
        AoIdentifier::PacId(pac_id) => role.pac_id.as_deref() == Some(pac_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FixtureGateway};

    fn service() -> AoVerificationService<FixtureGateway> {
        AoVerificationService::new(FixtureGateway)
    }

    #[tokio::test]
    async fn succeeds_with_good_input() {
        let result = service()
            .check_eligibility(testing::GOOD_ORG_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        match result {
            EligibilityResult::Approved { ao_role } => {
                assert_eq!(ao_role.pac_id.as_deref(), Some(testing::VALID_PAC_ID));
            }
            other => panic!("expected approval, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_npi_is_bad_npi_not_missing_enrollment() {
        let result = service()
            .check_eligibility(testing::BAD_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        assert_eq!(result.failure_reason(), Some("bad_npi"));
    }

    #[tokio::test]
    async fn no_approved_enrollments_rejected() {
        let result = service()
            .check_eligibility(testing::NO_APPROVED_ENROLLMENT_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        assert_eq!(result.failure_reason(), Some("no_approved_enrollment"));
    }

    #[tokio::test]
    async fn official_only_in_inactive_enrollment_rejected() {
        let result = service()
            .check_eligibility(testing::GOOD_ORG_NPI, &sha256_hex(testing::INACTIVE_AO_SSN))
            .await;
        assert_eq!(result.failure_reason(), Some("user_not_authorized_official"));
    }

    #[tokio::test]
    async fn non_official_rejected() {
        let result = service()
            .check_eligibility(testing::GOOD_ORG_NPI, &sha256_hex(testing::NOT_AO_SSN))
            .await;
        assert_eq!(result.failure_reason(), Some("user_not_authorized_official"));
    }

    #[tokio::test]
    async fn sanctioned_official_rejected() {
        let result = service()
            .check_eligibility(testing::GOOD_ORG_NPI, &sha256_hex(testing::SANCTIONED_AO_SSN))
            .await;
        assert_eq!(result.failure_reason(), Some("ao_med_sanctions"));
    }

    #[tokio::test]
    async fn sanctioned_organization_rejected() {
        let result = service()
            .check_eligibility(testing::SANCTIONED_ORG_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        assert_eq!(result.failure_reason(), Some("org_med_sanctions"));
    }

    #[tokio::test]
    async fn official_sanction_with_waiver_succeeds() {
        let result = service()
            .check_eligibility(testing::GOOD_ORG_NPI, &sha256_hex(testing::WAIVERED_AO_SSN))
            .await;
        assert!(result.success(), "waiver should neutralize the sanction: {result:?}");
    }

    #[tokio::test]
    async fn organization_sanction_with_waiver_succeeds() {
        let result = service()
            .check_eligibility(testing::WAIVERED_ORG_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        assert!(result.success(), "waiver should neutralize the sanction: {result:?}");
    }

    #[tokio::test]
    async fn gateway_server_error_maps_to_api_gateway_error() {
        let result = service()
            .check_eligibility(testing::SERVER_ERROR_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        assert!(!result.success());
        assert_eq!(result.failure_reason(), Some("api_gateway_error"));
    }

    #[tokio::test]
    async fn gateway_404_maps_to_invalid_endpoint() {
        let result = service()
            .check_eligibility(testing::INVALID_ENDPOINT_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        assert!(!result.success());
        assert_eq!(result.failure_reason(), Some("invalid_endpoint_called"));
    }

    #[tokio::test]
    async fn any_other_gateway_error_is_unexpected() {
        let result = service()
            .check_eligibility(testing::FLAKY_NPI, &sha256_hex(testing::AO_SSN))
            .await;
        assert!(!result.success());
        assert_eq!(result.failure_reason(), Some("unexpected_error"));
    }

    #[tokio::test]
    async fn standalone_check_works_with_hashed_ssn() {
        let role = service()
            .check_ao_eligibility(
                testing::GOOD_ORG_NPI,
                AoIdentifier::HashedSsn(&sha256_hex(testing::AO_SSN)),
            )
            .await
            .unwrap();
        assert_eq!(role.pac_id.as_deref(), Some(testing::VALID_PAC_ID));
    }

    #[tokio::test]
    async fn standalone_check_rejects_garbage_hash() {
        let err = service()
            .check_ao_eligibility(testing::GOOD_ORG_NPI, AoIdentifier::HashedSsn("not even a hash"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "user_not_authorized_official");
    }

    #[tokio::test]
    async fn standalone_check_works_with_pac_id() {
        service()
            .check_ao_eligibility(testing::GOOD_ORG_NPI, AoIdentifier::PacId(testing::VALID_PAC_ID))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn standalone_check_rejects_unknown_pac_id() {
        let err = service()
            .check_ao_eligibility(testing::GOOD_ORG_NPI, AoIdentifier::PacId("not there"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "user_not_authorized_official");
    }
}
