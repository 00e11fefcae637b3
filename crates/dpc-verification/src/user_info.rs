//! Identity-provider payload and the matching predicates used while an
//! invitation is being accepted.

use thiserror::Error;

use dpc_storage::Invitation;

use crate::eligibility::sha256_hex;

/// The user-info payload returned by the external identity provider after the
/// invitee authenticates.
#[derive(Clone, Debug, Default)]
pub struct UserInfo {
    /// Subject identifier; keys the local user account.
    pub sub: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub social_security_number: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserInfoError {
    #[error("missing_info")]
    MissingInfo,
}

/// Case-insensitive comparison of the payload email to the invited email.
pub fn email_match(invitation: &Invitation, info: &UserInfo) -> Result<bool, UserInfoError> {
    let email = info.email.as_deref().ok_or(UserInfoError::MissingInfo)?;
    Ok(email.eq_ignore_ascii_case(&invitation.invited_email))
}

/// Credential-delegate name check. Both names must be present in the payload;
/// only the family name is actually compared (case-insensitively).
pub fn cd_match(invitation: &Invitation, info: &UserInfo) -> Result<bool, UserInfoError> {
    let family_name = info.family_name.as_deref().ok_or(UserInfoError::MissingInfo)?;
    if info.given_name.as_deref().is_none_or(str::is_empty) {
        return Err(UserInfoError::MissingInfo);
    }
    Ok(family_name.eq_ignore_ascii_case(&invitation.invited_family_name))
}

/// Compares the trailing ten digits so formatting and country prefixes don't
/// matter.
pub fn phone_match(invitation: &Invitation, info: &UserInfo) -> bool {
    let Some(phone) = info.phone.as_deref() else {
        return false;
    };
    last_ten_digits(phone) == last_ten_digits(&invitation.invited_phone)
}

fn last_ten_digits(value: &str) -> String {
    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
    let start = digits.len().saturating_sub(10);
    digits[start..].iter().collect()
}

/// The SSN digest compared against enrollment roles: dashes stripped, then
/// SHA-256, hex encoded.
pub fn hashed_ssn(info: &UserInfo) -> Result<String, UserInfoError> {
    let ssn = info
        .social_security_number
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(UserInfoError::MissingInfo)?;
    let stripped: String = ssn.chars().filter(|c| *c != '-').collect();
    Ok(sha256_hex(&stripped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dpc_storage::{
        InvitationId, InvitationStatus, InvitationType, ProviderOrganizationId, UserId,
    };
    use uuid::Uuid;

    fn cd_invitation() -> Invitation {
        Invitation {
            id: InvitationId(Uuid::new_v4()),
            invitation_type: InvitationType::CredentialDelegate,
            status: InvitationStatus::Pending,
            invited_given_name: "Bob".into(),
            invited_family_name: "Hodges".into(),
            invited_phone: "2222222222".into(),
            invited_email: "bob@example.com".into(),
            verification_code: Some("ABC123".into()),
            failed_attempts: 0,
            provider_organization_id: ProviderOrganizationId(Uuid::new_v4()),
            invited_by: Some(UserId(Uuid::new_v4())),
            created_at: Utc::now(),
        }
    }

    fn payload() -> UserInfo {
        UserInfo {
            sub: "097d06f7-e9ad-4327-8db3-0ba193b7a2c2".into(),
            email: Some("bob@example.com".into()),
            given_name: Some("Bob".into()),
            family_name: Some("Hodges".into()),
            social_security_number: Some("900-88-8888".into()),
            phone: Some("+12222222222".into()),
        }
    }

    #[test]
    fn email_match_is_case_insensitive() {
        let invitation = cd_invitation();
        assert!(email_match(&invitation, &payload()).unwrap());

        let mut info = payload();
        info.email = Some("Bob@Example.com".into());
        assert!(email_match(&invitation, &info).unwrap());

        info.email = Some("not-bob@example.com".into());
        assert!(!email_match(&invitation, &info).unwrap());

        info.email = None;
        assert_eq!(email_match(&invitation, &info), Err(UserInfoError::MissingInfo));
    }

    #[test]
    fn cd_match_compares_family_name_only() {
        let invitation = cd_invitation();
        assert!(cd_match(&invitation, &payload()).unwrap());

        let mut info = payload();
        info.family_name = Some("HODGES".into());
        assert!(cd_match(&invitation, &info).unwrap());

        // The given name must be present but is not compared.
        info.given_name = Some("Somebody Else".into());
        assert!(cd_match(&invitation, &info).unwrap());

        info.family_name = Some("Something Else".into());
        assert!(!cd_match(&invitation, &info).unwrap());

        info.given_name = None;
        assert_eq!(cd_match(&invitation, &info), Err(UserInfoError::MissingInfo));

        let mut info = payload();
        info.family_name = None;
        assert_eq!(cd_match(&invitation, &info), Err(UserInfoError::MissingInfo));
    }

    #[test]
    fn phone_match_ignores_formatting() {
        let invitation = cd_invitation();
        assert!(phone_match(&invitation, &payload()));

        let mut info = payload();
        info.phone = Some("222-222-2222".into());
        assert!(phone_match(&invitation, &info));

        info.phone = Some("9999999999".into());
        assert!(!phone_match(&invitation, &info));

        info.phone = None;
        assert!(!phone_match(&invitation, &info));
    }

    #[test]
    fn hashed_ssn_strips_dashes() {
        let info = payload();
        let hashed = hashed_ssn(&info).unwrap();
        assert_eq!(hashed, sha256_hex("900888888"));

        let mut info = payload();
        info.social_security_number = None;
        assert_eq!(hashed_ssn(&info), Err(UserInfoError::MissingInfo));

        info.social_security_number = Some(String::new());
        assert_eq!(hashed_ssn(&info), Err(UserInfoError::MissingInfo));
    }
}
