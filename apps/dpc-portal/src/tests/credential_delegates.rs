//! Credential-delegate and authorized-official invitation creation tests.

use dpc_storage::{InvitationAttributes, InvitationType, Store};
use dpc_verification::testing::{self, FixtureGateway};

use super::common::*;
use crate::handlers::{
    AoInvitationError, AoInvitationService, CdInvitationError, CdInvitationService, FlowSession,
    InvitationFlows,
};

fn cd_attributes() -> InvitationAttributes {
    InvitationAttributes {
        invitation_type: Some(InvitationType::CredentialDelegate),
        invited_given_name: "Bob".to_string(),
        invited_family_name: "Hodges".to_string(),
        phone_raw: "111-111-1111".to_string(),
        invited_email: "bob@testy.com".to_string(),
        invited_email_confirmation: "bob@testy.com".to_string(),
    }
}

#[tokio::test]
async fn creates_invitation_with_code_and_sends_email() {
    let store = test_store().await;
    let (mailer, sent) = recording_mailer();
    let service = CdInvitationService::new(&store, Some(&mailer));
    let org = create_org(&store, testing::GOOD_ORG_NPI).await;
    let inviter = create_inviter(&store).await;

    let invitation = service.create(&org.id, &inviter.id, &cd_attributes()).await.unwrap();
    assert!(invitation.credential_delegate());
    assert_eq!(invitation.invited_phone, "1111111111");
    let code = invitation.verification_code.clone().unwrap();
    assert_eq!(code.len(), 6);

    let deliveries = sent.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].to, "bob@testy.com");
    assert!(deliveries[0].text.contains(&code));
}

#[tokio::test]
async fn validation_failures_do_not_create_a_record() {
    let store = test_store().await;
    let service = CdInvitationService::new(&store, None);
    let org = create_org(&store, testing::GOOD_ORG_NPI).await;
    let inviter = create_inviter(&store).await;

    let mut attributes = cd_attributes();
    attributes.invited_given_name.clear();
    let err = service.create(&org.id, &inviter.id, &attributes).await.unwrap_err();
    let CdInvitationError::Validation(errors) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(errors[0].field, "invited_given_name");

    assert!(!store
        .pending_cd_invitation_exists(&org.id, "", "Hodges", "bob@testy.com")
        .await
        .unwrap());
}

#[tokio::test]
async fn identical_pending_invitation_is_a_duplicate() {
    let store = test_store().await;
    let service = CdInvitationService::new(&store, None);
    let org = create_org(&store, testing::GOOD_ORG_NPI).await;
    let inviter = create_inviter(&store).await;

    service.create(&org.id, &inviter.id, &cd_attributes()).await.unwrap();
    let err = service.create(&org.id, &inviter.id, &cd_attributes()).await.unwrap_err();
    let CdInvitationError::Validation(errors) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(errors[0].field, "base");
}

#[tokio::test]
async fn an_active_delegate_with_matching_identity_is_a_duplicate() {
    let store = test_store().await;
    let verification = test_service();
    let cd_service = CdInvitationService::new(&store, None);
    let flows = InvitationFlows::new(&store, &verification, None);
    let org = create_org(&store, testing::GOOD_ORG_NPI).await;
    let inviter = create_inviter(&store).await;

    // Walk a first invitation all the way through registration.
    let invitation = create_cd_invitation(&store, &org, &inviter, None).await;
    let info = ao_user_info();
    let mut session = FlowSession::default();
    flows.accept(&org.id, &invitation.id, &info, &mut session).await.unwrap();
    flows.confirm(&org.id, &invitation.id, &info, Some("ABC123"), &mut session).await.unwrap();
    flows.register(&org.id, &invitation.id, &info, &mut session).await.unwrap();

    // The delegate now exists, so an identical invitation is rejected even
    // though no pending invitation remains.
    let err = cd_service.create(&org.id, &inviter.id, &cd_attributes()).await.unwrap_err();
    assert!(matches!(err, CdInvitationError::Validation(_)));
}

#[tokio::test]
async fn ao_invitation_creates_organization_from_gateway_lookup() {
    let store = test_store().await;
    let gateway = FixtureGateway;
    let (mailer, sent) = recording_mailer();
    let service = AoInvitationService::new(&store, &gateway, Some(&mailer));

    let invitation = service.invite(testing::GOOD_ORG_NPI, "ao@example.com").await.unwrap();
    assert!(invitation.authorized_official());
    assert!(invitation.invited_by.is_none());

    let org = store
        .find_organization_by_npi(testing::GOOD_ORG_NPI)
        .await
        .unwrap()
        .expect("organization mirror created");
    assert_eq!(org.name.as_deref(), Some("Test Health Organization"));

    let deliveries = sent.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].to, "ao@example.com");
    assert!(deliveries[0].subject.contains("Test Health Organization"));
}

#[tokio::test]
async fn ao_invitation_reuses_an_existing_organization() {
    let store = test_store().await;
    let gateway = FixtureGateway;
    let service = AoInvitationService::new(&store, &gateway, None);
    let org = create_org(&store, testing::GOOD_ORG_NPI).await;

    let invitation = service.invite(testing::GOOD_ORG_NPI, "ao@example.com").await.unwrap();
    assert_eq!(invitation.provider_organization_id, org.id);
}

#[tokio::test]
async fn ao_invitation_rejects_unknown_npi() {
    let store = test_store().await;
    let gateway = FixtureGateway;
    let service = AoInvitationService::new(&store, &gateway, None);

    let err = service.invite(testing::BAD_NPI, "ao@example.com").await.unwrap_err();
    assert!(matches!(err, AoInvitationError::UnknownNpi));
    assert!(store.find_organization_by_npi(testing::BAD_NPI).await.unwrap().is_none());
}

#[tokio::test]
async fn ao_invitation_rejects_a_malformed_email() {
    let store = test_store().await;
    let gateway = FixtureGateway;
    let service = AoInvitationService::new(&store, &gateway, None);

    let err = service.invite(testing::GOOD_ORG_NPI, "ao-at-example.com").await.unwrap_err();
    assert!(matches!(err, AoInvitationError::Validation(_)));
}
