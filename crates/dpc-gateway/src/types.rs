//! Wire types for CPI API Gateway responses.
//!
//! The gateway reports an unknown NPI with a `code: "404"` field inside a
//! 200 response body, never through the HTTP status; callers must check the
//! sentinel explicitly.

use chrono::NaiveDate;
use serde::Deserialize;

pub const NOT_FOUND_CODE: &str = "404";

/// Provider profile keyed by organization NPI: enrollments with their roles.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProviderProfile {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

impl ProviderProfile {
    pub fn not_found(&self) -> bool {
        self.code.as_deref() == Some(NOT_FOUND_CODE)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Enrollment {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub roles: Vec<EnrollmentRole>,
}

impl Enrollment {
    pub fn approved(&self) -> bool {
        self.status == "APPROVED"
    }
}

/// Authorized officials carry `roleCode == "10"`.
pub const AUTHORIZED_OFFICIAL_ROLE_CODE: &str = "10";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EnrollmentRole {
    #[serde(rename = "roleCode", default)]
    pub role_code: String,
    #[serde(default)]
    pub ssn: Option<String>,
    #[serde(rename = "pacId", default)]
    pub pac_id: Option<String>,
}

impl EnrollmentRole {
    pub fn authorized_official(&self) -> bool {
        self.role_code == AUTHORIZED_OFFICIAL_ROLE_CODE
    }
}

/// Provider-level info: sanctions and waivers, for an organization (by NPI)
/// or an individual (by SSN).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProviderInfo {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "providerName", default)]
    pub provider_name: Option<String>,
    #[serde(rename = "medSanctions", default)]
    pub med_sanctions: Vec<MedSanction>,
    #[serde(rename = "waiverInfo", default)]
    pub waivers: Vec<Waiver>,
}

impl ProviderInfo {
    pub fn not_found(&self) -> bool {
        self.code.as_deref() == Some(NOT_FOUND_CODE)
    }

    /// Waiver presence takes priority: when an active waiver exists the
    /// sanction records are not evaluated at all.
    pub fn sanctioned_as_of(&self, today: NaiveDate) -> bool {
        if self.waivers.iter().any(|w| w.active_as_of(today)) {
            return false;
        }
        self.med_sanctions.iter().any(|s| s.current_as_of(today))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MedSanction {
    #[serde(rename = "sanctionDate", default)]
    pub sanction_date: Option<NaiveDate>,
    #[serde(rename = "reinstatementDate", default)]
    pub reinstatement_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MedSanction {
    /// A sanction stays current until a reinstatement date in the past; a
    /// missing reinstatement date means it never lapses on its own.
    pub fn current_as_of(&self, today: NaiveDate) -> bool {
        match self.reinstatement_date {
            None => true,
            Some(date) => date > today,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Waiver {
    #[serde(rename = "endDate", default)]
    pub end_date: Option<NaiveDate>,
}

impl Waiver {
    pub fn active_as_of(&self, today: NaiveDate) -> bool {
        match self.end_date {
            None => false,
            Some(date) => date > today,
        }
    }
}
