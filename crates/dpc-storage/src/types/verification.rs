//! Verification standing shared by users, organizations, and AO links.

/// An entity's standing with respect to identity verification.
///
/// Applied uniformly: a `User`, a `ProviderOrganization`, and an `AoOrgLink`
/// all carry the same three-state standing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    Unverified,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unverified" => Some(Self::Unverified),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Closed vocabulary of reasons an entity can be marked rejected.
///
/// Covers both the stored administrative reasons (`ao_removal`,
/// `user_med_sanction`, `no_approved_enrollments`, `org_med_sanction`) and the
/// verdict set produced by the eligibility checks. The near-duplicate
/// spellings are intentional: both families appear in recorded data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationReason {
    AoRemoval,
    UserMedSanction,
    NoApprovedEnrollments,
    OrgMedSanction,
    OrgMedSanctions,
    AoMedSanctions,
    NoApprovedEnrollment,
    BadNpi,
    UserNotAuthorizedOfficial,
    ApiGatewayError,
    InvalidEndpointCalled,
    UnexpectedError,
}

impl VerificationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AoRemoval => "ao_removal",
            Self::UserMedSanction => "user_med_sanction",
            Self::NoApprovedEnrollments => "no_approved_enrollments",
            Self::OrgMedSanction => "org_med_sanction",
            Self::OrgMedSanctions => "org_med_sanctions",
            Self::AoMedSanctions => "ao_med_sanctions",
            Self::NoApprovedEnrollment => "no_approved_enrollment",
            Self::BadNpi => "bad_npi",
            Self::UserNotAuthorizedOfficial => "user_not_authorized_official",
            Self::ApiGatewayError => "api_gateway_error",
            Self::InvalidEndpointCalled => "invalid_endpoint_called",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ao_removal" => Some(Self::AoRemoval),
            "user_med_sanction" => Some(Self::UserMedSanction),
            "no_approved_enrollments" => Some(Self::NoApprovedEnrollments),
            "org_med_sanction" => Some(Self::OrgMedSanction),
            "org_med_sanctions" => Some(Self::OrgMedSanctions),
            "ao_med_sanctions" => Some(Self::AoMedSanctions),
            "no_approved_enrollment" => Some(Self::NoApprovedEnrollment),
            "bad_npi" => Some(Self::BadNpi),
            "user_not_authorized_official" => Some(Self::UserNotAuthorizedOfficial),
            "api_gateway_error" => Some(Self::ApiGatewayError),
            "invalid_endpoint_called" => Some(Self::InvalidEndpointCalled),
            "unexpected_error" => Some(Self::UnexpectedError),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_round_trip() {
        let all = [
            VerificationReason::AoRemoval,
            VerificationReason::UserMedSanction,
            VerificationReason::NoApprovedEnrollments,
            VerificationReason::OrgMedSanction,
            VerificationReason::OrgMedSanctions,
            VerificationReason::AoMedSanctions,
            VerificationReason::NoApprovedEnrollment,
            VerificationReason::BadNpi,
            VerificationReason::UserNotAuthorizedOfficial,
            VerificationReason::ApiGatewayError,
            VerificationReason::InvalidEndpointCalled,
            VerificationReason::UnexpectedError,
        ];
        for reason in all {
            assert_eq!(VerificationReason::from_str(reason.as_str()), Some(reason));
        }
    }

    #[test]
    fn enrollment_spellings_are_distinct() {
        // Both the legacy stored value and the verdict value must survive a
        // round trip without collapsing into each other.
        assert_ne!(
            VerificationReason::from_str("no_approved_enrollments"),
            VerificationReason::from_str("no_approved_enrollment"),
        );
    }

    #[test]
    fn unknown_reason_is_none() {
        assert_eq!(VerificationReason::from_str("birthday_party"), None);
        assert_eq!(VerificationStatus::from_str("maybe"), None);
    }
}
