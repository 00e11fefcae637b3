//! Invitation entity and creation-time validation.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use super::{InvitationId, ProviderOrganizationId, UserId};

/// Invitations expire this many hours after creation. Expiry is derived from
/// `created_at` on read, never stored.
pub const INVITATION_TTL_HOURS: i64 = 48;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvitationType {
    AuthorizedOfficial,
    CredentialDelegate,
}

impl InvitationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizedOfficial => "authorized_official",
            Self::CredentialDelegate => "credential_delegate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "authorized_official" => Some(Self::AuthorizedOfficial),
            "credential_delegate" => Some(Self::CredentialDelegate),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Cancelled,
    Renewed,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Cancelled => "cancelled",
            Self::Renewed => "renewed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "cancelled" => Some(Self::Cancelled),
            "renewed" => Some(Self::Renewed),
            _ => None,
        }
    }
}

/// Why an invitation can no longer be accepted, in display-routing vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnacceptableReason {
    Invalid,
    AoRenewed,
    AoAccepted,
    CdAccepted,
    AoExpired,
    CdExpired,
}

impl UnacceptableReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::AoRenewed => "ao_renewed",
            Self::AoAccepted => "ao_accepted",
            Self::CdAccepted => "cd_accepted",
            Self::AoExpired => "ao_expired",
            Self::CdExpired => "cd_expired",
        }
    }
}

/// An offer to become an Authorized Official or Credential Delegate for an
/// organization. Invitee PII is cleared when the invitation is accepted.
#[derive(Clone, Debug)]
pub struct Invitation {
    pub id: InvitationId,
    pub invitation_type: InvitationType,
    pub status: InvitationStatus,
    pub invited_given_name: String,
    pub invited_family_name: String,
    pub invited_phone: String,
    pub invited_email: String,
    /// One-time code mailed with credential-delegate invitations.
    pub verification_code: Option<String>,
    pub failed_attempts: i32,
    pub provider_organization_id: ProviderOrganizationId,
    pub invited_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn authorized_official(&self) -> bool {
        self.invitation_type == InvitationType::AuthorizedOfficial
    }

    pub fn credential_delegate(&self) -> bool {
        self.invitation_type == InvitationType::CredentialDelegate
    }

    pub fn pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    pub fn accepted(&self) -> bool {
        self.status == InvitationStatus::Accepted
    }

    pub fn cancelled(&self) -> bool {
        self.status == InvitationStatus::Cancelled
    }

    pub fn renewed(&self) -> bool {
        self.status == InvitationStatus::Renewed
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(INVITATION_TTL_HOURS)
    }

    /// An invitation exactly 48 hours old is already expired.
    pub fn expired_as_of(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Remaining `(hours, minutes)` until expiry, floor-divided. Returns
    /// `(0, 0)` once expired.
    pub fn expires_in(&self, now: DateTime<Utc>) -> (i64, i64) {
        let remaining = self.expires_at() - now;
        let minutes = remaining.num_minutes();
        if minutes <= 0 {
            (0, 0)
        } else {
            (minutes / 60, minutes % 60)
        }
    }

    /// Whether this invitation can still be accepted, and if not, why.
    /// Cancellation beats renewal beats acceptance beats expiration.
    pub fn unacceptable_reason(&self, now: DateTime<Utc>) -> Option<UnacceptableReason> {
        if self.cancelled() {
            Some(UnacceptableReason::Invalid)
        } else if self.renewed() {
            Some(UnacceptableReason::AoRenewed)
        } else if self.accepted() {
            if self.authorized_official() {
                Some(UnacceptableReason::AoAccepted)
            } else {
                Some(UnacceptableReason::CdAccepted)
            }
        } else if self.expired_as_of(now) {
            if self.authorized_official() {
                Some(UnacceptableReason::AoExpired)
            } else {
                Some(UnacceptableReason::CdExpired)
            }
        } else {
            None
        }
    }

    /// A renewal is only offered for a pending, expired AO invitation.
    pub fn renewable(&self, now: DateTime<Utc>) -> bool {
        self.pending() && self.expired_as_of(now) && self.authorized_official()
    }
}

/// A field-level validation failure, suitable for re-rendering a form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Submitted invitation attributes, validated before a row is created.
///
/// Credential-delegate invitations require the full identity set; authorized
/// official invitations only carry an email.
#[derive(Clone, Debug, Default)]
pub struct InvitationAttributes {
    pub invitation_type: Option<InvitationType>,
    pub invited_given_name: String,
    pub invited_family_name: String,
    pub phone_raw: String,
    pub invited_email: String,
    pub invited_email_confirmation: String,
}

impl InvitationAttributes {
    /// Phone digits with punctuation stripped.
    pub fn normalized_phone(&self) -> String {
        self.phone_raw.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let Some(invitation_type) = self.invitation_type else {
            errors.push(ValidationError::new("invitation_type", "can't be blank"));
            return Err(errors);
        };

        if invitation_type == InvitationType::CredentialDelegate {
            if self.invited_given_name.is_empty() {
                errors.push(ValidationError::new("invited_given_name", "can't be blank"));
            }
            if self.invited_family_name.is_empty() {
                errors.push(ValidationError::new("invited_family_name", "can't be blank"));
            }
            if self.phone_raw.is_empty() {
                errors.push(ValidationError::new("phone_raw", "can't be blank"));
            }
            if self.normalized_phone().len() != 10 {
                errors.push(ValidationError::new("invited_phone", "is invalid"));
            }
        }

        if self.invited_email.is_empty() {
            errors.push(ValidationError::new("invited_email", "can't be blank"));
        }
        if !EMAIL_RE.is_match(&self.invited_email) {
            errors.push(ValidationError::new("invited_email", "is invalid"));
        }
        if self.invited_email_confirmation.is_empty() {
            errors.push(ValidationError::new("invited_email_confirmation", "can't be blank"));
        } else if self.invited_email_confirmation != self.invited_email {
            errors.push(ValidationError::new(
                "invited_email_confirmation",
                "doesn't match Invited email",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateInvitationParams {
    pub invitation_type: InvitationType,
    pub provider_organization_id: ProviderOrganizationId,
    pub invited_by: Option<UserId>,
    pub invited_given_name: String,
    pub invited_family_name: String,
    pub invited_phone: String,
    pub invited_email: String,
    pub verification_code: Option<String>,
    /// Defaults to the current time; expiry is derived from this.
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn invitation(invitation_type: InvitationType, created_at: DateTime<Utc>) -> Invitation {
        Invitation {
            id: InvitationId(Uuid::new_v4()),
            invitation_type,
            status: InvitationStatus::Pending,
            invited_given_name: "Bob".into(),
            invited_family_name: "Hodges".into(),
            invited_phone: "2222222222".into(),
            invited_email: "bob@example.com".into(),
            verification_code: None,
            failed_attempts: 0,
            provider_organization_id: ProviderOrganizationId(Uuid::new_v4()),
            invited_by: Some(UserId(Uuid::new_v4())),
            created_at,
        }
    }

    fn cd_attributes() -> InvitationAttributes {
        InvitationAttributes {
            invitation_type: Some(InvitationType::CredentialDelegate),
            invited_given_name: "Bob".into(),
            invited_family_name: "Hodges".into(),
            phone_raw: "877-288-3135".into(),
            invited_email: "bob@example.com".into(),
            invited_email_confirmation: "bob@example.com".into(),
        }
    }

    #[test]
    fn not_expired_under_48_hours() {
        let now = Utc::now();
        let inv = invitation(InvitationType::AuthorizedOfficial, now - Duration::hours(47));
        assert!(!inv.expired_as_of(now));
    }

    #[test]
    fn expired_at_exactly_48_hours() {
        let now = Utc::now();
        let inv = invitation(InvitationType::AuthorizedOfficial, now - Duration::hours(48));
        assert!(inv.expired_as_of(now));
    }

    #[test]
    fn expired_past_48_hours() {
        let now = Utc::now();
        let inv = invitation(InvitationType::CredentialDelegate, now - Duration::hours(49));
        assert!(inv.expired_as_of(now));
    }

    #[test]
    fn expires_in_floor_divides() {
        let now = Utc::now();
        let inv = invitation(
            InvitationType::AuthorizedOfficial,
            now - Duration::hours(46) - Duration::minutes(30),
        );
        assert_eq!(inv.expires_in(now), (1, 30));

        let expired = invitation(InvitationType::AuthorizedOfficial, now - Duration::hours(72));
        assert_eq!(expired.expires_in(now), (0, 0));
    }

    #[test]
    fn unacceptable_reason_priority() {
        let now = Utc::now();

        // Cancelled beats everything, including expiry.
        let mut inv = invitation(InvitationType::AuthorizedOfficial, now - Duration::hours(72));
        inv.status = InvitationStatus::Cancelled;
        assert_eq!(inv.unacceptable_reason(now), Some(UnacceptableReason::Invalid));

        inv.status = InvitationStatus::Renewed;
        assert_eq!(inv.unacceptable_reason(now), Some(UnacceptableReason::AoRenewed));

        inv.status = InvitationStatus::Accepted;
        assert_eq!(inv.unacceptable_reason(now), Some(UnacceptableReason::AoAccepted));

        inv.status = InvitationStatus::Pending;
        assert_eq!(inv.unacceptable_reason(now), Some(UnacceptableReason::AoExpired));

        let mut cd = invitation(InvitationType::CredentialDelegate, now - Duration::hours(72));
        cd.status = InvitationStatus::Accepted;
        assert_eq!(cd.unacceptable_reason(now), Some(UnacceptableReason::CdAccepted));
        cd.status = InvitationStatus::Pending;
        assert_eq!(cd.unacceptable_reason(now), Some(UnacceptableReason::CdExpired));

        let fresh = invitation(InvitationType::CredentialDelegate, now);
        assert_eq!(fresh.unacceptable_reason(now), None);
    }

    #[test]
    fn renewable_only_for_pending_expired_ao() {
        let now = Utc::now();
        let expired_ao = invitation(InvitationType::AuthorizedOfficial, now - Duration::hours(49));
        assert!(expired_ao.renewable(now));

        let fresh_ao = invitation(InvitationType::AuthorizedOfficial, now);
        assert!(!fresh_ao.renewable(now));

        let expired_cd = invitation(InvitationType::CredentialDelegate, now - Duration::hours(49));
        assert!(!expired_cd.renewable(now));

        let mut renewed = invitation(InvitationType::AuthorizedOfficial, now - Duration::hours(49));
        renewed.status = InvitationStatus::Renewed;
        assert!(!renewed.renewable(now));
    }

    #[test]
    fn cd_attributes_valid() {
        assert!(cd_attributes().validate().is_ok());
    }

    #[test]
    fn cd_requires_names() {
        let mut attrs = cd_attributes();
        attrs.invited_given_name.clear();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("invited_given_name", "can't be blank")]);

        let mut attrs = cd_attributes();
        attrs.invited_family_name.clear();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("invited_family_name", "can't be blank")]);
    }

    #[test]
    fn cd_phone_must_have_ten_digits() {
        let mut attrs = cd_attributes();
        attrs.phone_raw = "877-288-313".into();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("invited_phone", "is invalid")]);

        attrs.phone_raw = "877-288-31333".into();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("invited_phone", "is invalid")]);

        attrs.phone_raw.clear();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::new("phone_raw", "can't be blank"),
                ValidationError::new("invited_phone", "is invalid"),
            ]
        );
    }

    #[test]
    fn bad_email_rejected_for_both_types() {
        let mut cd = cd_attributes();
        cd.invited_email = "rob-at-example.com".into();
        cd.invited_email_confirmation = "rob-at-example.com".into();
        let errors = cd.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("invited_email", "is invalid")]);

        let ao = InvitationAttributes {
            invitation_type: Some(InvitationType::AuthorizedOfficial),
            invited_email: "rob-at-example.com".into(),
            invited_email_confirmation: "rob-at-example.com".into(),
            ..Default::default()
        };
        let errors = ao.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("invited_email", "is invalid")]);
    }

    #[test]
    fn blank_email_collects_three_errors() {
        let mut attrs = cd_attributes();
        attrs.invited_email.clear();
        attrs.invited_email_confirmation.clear();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::new("invited_email", "can't be blank")));
        assert!(errors.contains(&ValidationError::new("invited_email", "is invalid")));
        assert!(errors.contains(&ValidationError::new("invited_email_confirmation", "can't be blank")));
    }

    #[test]
    fn mismatched_confirmation_rejected() {
        let mut attrs = cd_attributes();
        attrs.invited_email_confirmation = "robert@example.com".into();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::new("invited_email_confirmation", "doesn't match Invited email")]
        );
    }

    #[test]
    fn ao_allows_blank_names_and_phone() {
        let attrs = InvitationAttributes {
            invitation_type: Some(InvitationType::AuthorizedOfficial),
            invited_email: "rob@example.com".into(),
            invited_email_confirmation: "rob@example.com".into(),
            ..Default::default()
        };
        assert!(attrs.validate().is_ok());
    }

    #[test]
    fn missing_type_rejected() {
        let attrs = InvitationAttributes::default();
        let errors = attrs.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("invitation_type", "can't be blank")]);
    }
}
