//! Periodic batch re-verification of Authorized Official links and
//! organization standing.
//!
//! A definitive rejection from the eligibility checks is recorded as a final
//! verdict and advances `last_checked_at`, so the record is not reconsidered
//! until the next lookback window. A gateway or storage failure aborts the
//! run with the record untouched; the next scheduled run picks it up again.

use std::env;

use chrono::{Duration, Utc};
use thiserror::Error;

use dpc_gateway::{CpiGateway, GatewayError};
use dpc_storage::{AoOrgLink, ProviderOrganization, Store, StoreError};

use crate::eligibility::{
    AoIdentifier, AoVerificationService, EligibilityError, EligibilityFailure,
};

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Batch sizing knobs, read from the environment.
#[derive(Clone, Copy, Debug)]
pub struct VerificationSettings {
    pub max_records: u32,
    pub lookback_hours: i64,
}

pub const DEFAULT_MAX_RECORDS: u32 = 10;
pub const DEFAULT_LOOKBACK_HOURS: i64 = 144;

impl VerificationSettings {
    /// `MAX_RECORDS` / `LOOKBACK_HOURS`, used by [`VerifyAoJob`].
    pub fn ao_from_env() -> Self {
        Self {
            max_records: env_or("MAX_RECORDS", DEFAULT_MAX_RECORDS),
            lookback_hours: env_or("LOOKBACK_HOURS", DEFAULT_LOOKBACK_HOURS),
        }
    }

    /// `VERIFICATION_MAX_RECORDS` / `VERIFICATION_LOOKBACK_HOURS`, used by
    /// [`VerifyProviderOrganizationJob`].
    pub fn organization_from_env() -> Self {
        Self {
            max_records: env_or("VERIFICATION_MAX_RECORDS", DEFAULT_MAX_RECORDS),
            lookback_hours: env_or("VERIFICATION_LOOKBACK_HOURS", DEFAULT_LOOKBACK_HOURS),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Re-verifies existing Authorized-Official links against the gateway by
/// PAC ID, degrading the link (and, for sanction findings, the user and
/// organizations) when a check fails.
pub struct VerifyAoJob<'a, S, G> {
    store: &'a S,
    service: &'a AoVerificationService<G>,
    settings: VerificationSettings,
}

impl<'a, S: Store, G: CpiGateway> VerifyAoJob<'a, S, G> {
    pub fn new(
        store: &'a S,
        service: &'a AoVerificationService<G>,
        settings: VerificationSettings,
    ) -> Self {
        Self { store, service, settings }
    }

    /// Processes one bounded batch and returns how many links were examined.
    pub async fn run(&self) -> Result<usize, JobError> {
        let now = Utc::now();
        let cutoff = now - Duration::hours(self.settings.lookback_hours);
        let links = self
            .store
            .ao_links_to_verify(cutoff, self.settings.max_records)
            .await?;
        tracing::info!(batch = links.len(), "verifying authorized official links");

        for link in &links {
            self.verify_link(link).await?;
        }
        Ok(links.len())
    }

    async fn verify_link(&self, link: &AoOrgLink) -> Result<(), JobError> {
        let now = Utc::now();
        let user = self.store.get_user(&link.user_id).await?;
        let organization = self.store.get_organization(&link.provider_organization_id).await?;
        let pac_id = user.pac_id.clone().unwrap_or_default();

        match self
            .service
            .check_ao_eligibility(&organization.npi, AoIdentifier::PacId(&pac_id))
            .await
        {
            Ok(_) => {
                self.store.touch_ao_link_checked(&link.id, now).await?;
                self.store.touch_user_checked(&user.id, now).await?;
                Ok(())
            }
            Err(EligibilityError::Ineligible(failure)) => {
                tracing::warn!(
                    npi = %organization.npi,
                    reason = failure.as_str(),
                    "authorized official link failed re-verification"
                );
                let reason = failure.verification_reason();
                match failure {
                    EligibilityFailure::AoMedSanctions => {
                        // The sanction attaches to the person: every
                        // organization the user represents loses standing.
                        self.store.reject_sanctioned_ao(&user.id, reason, now).await?;
                    }
                    EligibilityFailure::NoApprovedEnrollment => {
                        // The official is personally fine; the organization's
                        // enrollment lapsed.
                        self.store
                            .fail_ao_link_and_reject_organization(&link.id, reason, now)
                            .await?;
                    }
                    _ => {
                        self.store.fail_ao_link(&link.id, reason, now).await?;
                    }
                }
                Ok(())
            }
            Err(EligibilityError::Gateway(error)) => Err(error.into()),
        }
    }
}

/// Re-verifies approved organizations (sanctions, then enrollments) and
/// cascades a rejection to their currently-approved AO links.
pub struct VerifyProviderOrganizationJob<'a, S, G> {
    store: &'a S,
    service: &'a AoVerificationService<G>,
    settings: VerificationSettings,
}

impl<'a, S: Store, G: CpiGateway> VerifyProviderOrganizationJob<'a, S, G> {
    pub fn new(
        store: &'a S,
        service: &'a AoVerificationService<G>,
        settings: VerificationSettings,
    ) -> Self {
        Self { store, service, settings }
    }

    /// Processes one bounded batch and returns how many organizations were
    /// examined.
    pub async fn run(&self) -> Result<usize, JobError> {
        let now = Utc::now();
        let cutoff = now - Duration::hours(self.settings.lookback_hours);
        let organizations = self
            .store
            .organizations_to_verify(cutoff, self.settings.max_records)
            .await?;
        tracing::info!(batch = organizations.len(), "verifying provider organizations");

        for organization in &organizations {
            self.verify_organization(organization).await?;
        }
        Ok(organizations.len())
    }

    /// Keeps running batches while full ones come back, the way the scheduled
    /// job re-enqueues itself until no stale records remain.
    pub async fn run_to_completion(&self) -> Result<usize, JobError> {
        let mut total = 0;
        loop {
            let processed = self.run().await?;
            total += processed;
            if processed < self.settings.max_records as usize {
                return Ok(total);
            }
        }
    }

    async fn verify_organization(
        &self,
        organization: &ProviderOrganization,
    ) -> Result<(), JobError> {
        let now = Utc::now();
        let outcome = async {
            self.service.check_org_med_sanctions(&organization.npi).await?;
            self.service.get_approved_enrollments(&organization.npi).await?;
            Ok::<(), EligibilityError>(())
        }
        .await;

        match outcome {
            Ok(()) => {
                self.store.touch_organization_checked(&organization.id, now).await?;
                Ok(())
            }
            Err(EligibilityError::Ineligible(failure)) => {
                tracing::warn!(
                    npi = %organization.npi,
                    reason = failure.as_str(),
                    "provider organization failed re-verification"
                );
                self.store
                    .reject_organization_cascade(
                        &organization.id,
                        failure.verification_reason(),
                        now,
                    )
                    .await?;
                Ok(())
            }
            Err(EligibilityError::Gateway(error)) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn settings_default_when_unset() {
        let _lock = ENV_MUTEX.lock().unwrap();
        env::remove_var("MAX_RECORDS");
        env::remove_var("LOOKBACK_HOURS");
        let settings = VerificationSettings::ao_from_env();
        assert_eq!(settings.max_records, 10);
        assert_eq!(settings.lookback_hours, 144);
    }

    #[test]
    fn settings_read_their_own_variables() {
        let _lock = ENV_MUTEX.lock().unwrap();
        env::set_var("MAX_RECORDS", "4");
        env::set_var("LOOKBACK_HOURS", "240");
        env::set_var("VERIFICATION_MAX_RECORDS", "7");
        env::set_var("VERIFICATION_LOOKBACK_HOURS", "72");

        let ao = VerificationSettings::ao_from_env();
        assert_eq!((ao.max_records, ao.lookback_hours), (4, 240));

        let org = VerificationSettings::organization_from_env();
        assert_eq!((org.max_records, org.lookback_hours), (7, 72));

        env::remove_var("MAX_RECORDS");
        env::remove_var("LOOKBACK_HOURS");
        env::remove_var("VERIFICATION_MAX_RECORDS");
        env::remove_var("VERIFICATION_LOOKBACK_HOURS");
    }

    #[test]
    fn unparseable_settings_fall_back_to_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        env::set_var("MAX_RECORDS", "many");
        let settings = VerificationSettings::ao_from_env();
        assert_eq!(settings.max_records, 10);
        env::remove_var("MAX_RECORDS");
    }
}
