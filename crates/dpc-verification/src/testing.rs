//! Canned CPI API Gateway for tests.
//!
//! Responses are keyed by well-known NPIs and SSNs so eligibility scenarios
//! can be driven without a network. Enrollment roles carry the person's SSN
//! as their PAC ID, which lets the same identities exercise both identifier
//! paths.

use chrono::{Duration, Utc};

use dpc_gateway::{
    CpiGateway, Enrollment, EnrollmentRole, GatewayError, MedSanction, ProviderInfo,
    ProviderProfile, Waiver, NOT_FOUND_CODE,
};

/// Organization with one approved enrollment and a full roster of roles.
pub const GOOD_ORG_NPI: &str = "3077494235";
/// Reported by the gateway as `code: "404"`.
pub const BAD_NPI: &str = "3299073577";
/// Enrollments exist but none are `APPROVED`.
pub const NO_APPROVED_ENROLLMENT_NPI: &str = "3782297014";
/// Organization under an active medical sanction.
pub const SANCTIONED_ORG_NPI: &str = "3598564557";
/// Organization sanctioned but covered by an active waiver.
pub const WAIVERED_ORG_NPI: &str = "3098168743";
/// Gateway answers HTTP 500.
pub const SERVER_ERROR_NPI: &str = "3593081045";
/// Gateway answers HTTP 404.
pub const INVALID_ENDPOINT_NPI: &str = "3746980325";
/// Gateway answers HTTP 503.
pub const FLAKY_NPI: &str = "3302763388";

/// Authorized official in the approved enrollment.
pub const AO_SSN: &str = "900111111";
pub const VALID_PAC_ID: &str = "validPacId";
/// Authorized official, but only in an inactive enrollment.
pub const INACTIVE_AO_SSN: &str = "900222222";
/// Present in the approved enrollment without the AO role code.
pub const NOT_AO_SSN: &str = "111223456";
/// Authorized official with an active personal medical sanction.
pub const SANCTIONED_AO_SSN: &str = "900666666";
/// Authorized official whose sanction is covered by an active waiver.
pub const WAIVERED_AO_SSN: &str = "900777777";

pub struct FixtureGateway;

fn role(role_code: &str, ssn: &str, pac_id: &str) -> EnrollmentRole {
    EnrollmentRole {
        role_code: role_code.to_string(),
        ssn: Some(ssn.to_string()),
        pac_id: Some(pac_id.to_string()),
    }
}

fn open_sanction() -> MedSanction {
    MedSanction {
        sanction_date: Some(Utc::now().date_naive() - Duration::days(400)),
        reinstatement_date: None,
        description: Some("OIG exclusion".to_string()),
    }
}

fn active_waiver() -> Waiver {
    Waiver { end_date: Some(Utc::now().date_naive() + Duration::days(365)) }
}

fn error_for(npi_or_ssn: &str) -> Option<GatewayError> {
    let status = match npi_or_ssn {
        SERVER_ERROR_NPI => 500,
        INVALID_ENDPOINT_NPI => 404,
        FLAKY_NPI => 503,
        _ => return None,
    };
    Some(GatewayError::Http { status, body: String::new() })
}

#[async_trait::async_trait]
impl CpiGateway for FixtureGateway {
    async fn fetch_profile(&self, npi: &str) -> Result<ProviderProfile, GatewayError> {
        if let Some(error) = error_for(npi) {
            return Err(error);
        }
        if npi == BAD_NPI {
            return Ok(ProviderProfile {
                code: Some(NOT_FOUND_CODE.to_string()),
                enrollments: vec![],
            });
        }
        if npi == NO_APPROVED_ENROLLMENT_NPI {
            return Ok(ProviderProfile {
                code: None,
                enrollments: vec![Enrollment {
                    status: "INACTIVE".to_string(),
                    roles: vec![role("10", AO_SSN, VALID_PAC_ID)],
                }],
            });
        }
        Ok(ProviderProfile {
            code: None,
            enrollments: vec![
                Enrollment {
                    status: "APPROVED".to_string(),
                    roles: vec![
                        role("10", AO_SSN, VALID_PAC_ID),
                        role("10", SANCTIONED_AO_SSN, SANCTIONED_AO_SSN),
                        role("10", WAIVERED_AO_SSN, WAIVERED_AO_SSN),
                        role("30", NOT_AO_SSN, NOT_AO_SSN),
                    ],
                },
                Enrollment {
                    status: "INACTIVE".to_string(),
                    roles: vec![role("10", INACTIVE_AO_SSN, INACTIVE_AO_SSN)],
                },
            ],
        })
    }

    async fn fetch_med_sanctions_and_waivers_by_ssn(
        &self,
        ssn: &str,
    ) -> Result<ProviderInfo, GatewayError> {
        if let Some(error) = error_for(ssn) {
            return Err(error);
        }
        let info = match ssn {
            SANCTIONED_AO_SSN => ProviderInfo {
                med_sanctions: vec![open_sanction()],
                ..Default::default()
            },
            WAIVERED_AO_SSN => ProviderInfo {
                med_sanctions: vec![open_sanction()],
                waivers: vec![active_waiver()],
                ..Default::default()
            },
            _ => ProviderInfo::default(),
        };
        Ok(info)
    }

    async fn org_info(&self, npi: &str) -> Result<ProviderInfo, GatewayError> {
        if let Some(error) = error_for(npi) {
            return Err(error);
        }
        let info = match npi {
            SANCTIONED_ORG_NPI => ProviderInfo {
                provider_name: Some("Sanctioned Health".to_string()),
                med_sanctions: vec![open_sanction()],
                ..Default::default()
            },
            WAIVERED_ORG_NPI => ProviderInfo {
                provider_name: Some("Waivered Health".to_string()),
                med_sanctions: vec![open_sanction()],
                waivers: vec![active_waiver()],
                ..Default::default()
            },
            BAD_NPI => ProviderInfo {
                code: Some(NOT_FOUND_CODE.to_string()),
                ..Default::default()
            },
            _ => ProviderInfo {
                provider_name: Some("Test Health Organization".to_string()),
                ..Default::default()
            },
        };
        Ok(info)
    }
}
