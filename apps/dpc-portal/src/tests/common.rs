//! Shared test helpers: in-memory store, canned gateway, recording mailer,
//! and identity payloads matching the gateway fixtures.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dpc_storage::{
    CreateInvitationParams, CreateOrganizationParams, CreateUserParams, Invitation,
    InvitationType, ProviderOrganization, Store, User,
};
use dpc_store_sqlite::SqliteStore;
use dpc_verification::testing::{self, FixtureGateway};
use dpc_verification::{AoVerificationService, UserInfo};

use crate::email::{EmailError, EmailProvider, InvitationEmailContent, Mailer};

pub async fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().await.unwrap()
}

pub fn test_service() -> AoVerificationService<FixtureGateway> {
    AoVerificationService::new(FixtureGateway)
}

pub async fn create_org(store: &SqliteStore, npi: &str) -> ProviderOrganization {
    store
        .create_organization(&CreateOrganizationParams {
            npi: npi.to_string(),
            name: Some("Test Health Organization".to_string()),
        })
        .await
        .unwrap()
}

pub async fn create_inviter(store: &SqliteStore) -> User {
    store
        .create_user(&CreateUserParams {
            uid: "inviter-sub".to_string(),
            email: "ao@example.com".to_string(),
            given_name: "Alice".to_string(),
            family_name: "Official".to_string(),
            pac_id: Some(testing::VALID_PAC_ID.to_string()),
        })
        .await
        .unwrap()
}

pub async fn create_ao_invitation(
    store: &SqliteStore,
    organization: &ProviderOrganization,
    created_at: Option<DateTime<Utc>>,
) -> Invitation {
    store
        .create_invitation(&CreateInvitationParams {
            invitation_type: InvitationType::AuthorizedOfficial,
            provider_organization_id: organization.id.clone(),
            invited_by: None,
            invited_given_name: String::new(),
            invited_family_name: String::new(),
            invited_phone: String::new(),
            invited_email: "bob@testy.com".to_string(),
            verification_code: None,
            created_at,
        })
        .await
        .unwrap()
}

pub async fn create_cd_invitation(
    store: &SqliteStore,
    organization: &ProviderOrganization,
    inviter: &User,
    created_at: Option<DateTime<Utc>>,
) -> Invitation {
    store
        .create_invitation(&CreateInvitationParams {
            invitation_type: InvitationType::CredentialDelegate,
            provider_organization_id: organization.id.clone(),
            invited_by: Some(inviter.id.clone()),
            invited_given_name: "Bob".to_string(),
            invited_family_name: "Hodges".to_string(),
            invited_phone: "1111111111".to_string(),
            invited_email: "bob@testy.com".to_string(),
            verification_code: Some("ABC123".to_string()),
            created_at,
        })
        .await
        .unwrap()
}

/// Identity payload for the fixture gateway's valid authorized official.
pub fn ao_user_info() -> UserInfo {
    UserInfo {
        sub: "097d06f7-e9ad-4327-8db3-0ba193b7a2c2".to_string(),
        email: Some("bob@testy.com".to_string()),
        given_name: Some("Bob".to_string()),
        family_name: Some("Hodges".to_string()),
        social_security_number: Some("900-11-1111".to_string()),
        phone: Some("+11111111111".to_string()),
    }
}

#[derive(Clone, Debug)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

struct RecordingProvider {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

#[async_trait]
impl EmailProvider for RecordingProvider {
    async fn send(
        &self,
        to: &str,
        content: &InvitationEmailContent,
        _from_address: &str,
        _from_name: Option<&str>,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: content.subject.clone(),
            text: content.text.clone(),
        });
        Ok(())
    }
}

/// A mailer whose deliveries can be inspected after the fact.
pub fn recording_mailer() -> (Mailer, Arc<Mutex<Vec<SentEmail>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let provider = RecordingProvider { sent: sent.clone() };
    let mailer = Mailer::new(
        Box::new(provider),
        "noreply@dpc.example.gov".to_string(),
        Some("DPC Portal".to_string()),
    );
    (mailer, sent)
}
