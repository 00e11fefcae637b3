//! SQLite implementation of the DPC portal storage trait.
//!
//! Rows keep timestamps as unix seconds and enums as their string form; the
//! mapping helpers below translate to the typed records in `dpc-storage`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use dpc_storage::{
    AoOrgLink, AoOrgLinkId, CdOrgLink, CdOrgLinkId, CreateAoOrgLinkParams, CreateCdOrgLinkParams,
    CreateInvitationParams, CreateOrganizationParams, CreateUserParams, Invitation, InvitationId,
    InvitationStatus, InvitationType, ProviderOrganization, ProviderOrganizationId, Store,
    StoreError, User, UserId, VerificationReason, VerificationStatus,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(backend)?;

        MIGRATOR.run(&pool).await.map_err(backend)?;

        Ok(Self { pool })
    }
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn unique_or_backend(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

fn ts(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

fn from_ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

fn opt_ts(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.map(from_ts)
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(backend)
}

fn parse_status(s: &str) -> Result<VerificationStatus, StoreError> {
    VerificationStatus::from_str(s)
        .ok_or_else(|| StoreError::Backend(format!("unknown verification status: {s}")))
}

fn parse_reason(s: Option<String>) -> Result<Option<VerificationReason>, StoreError> {
    match s {
        None => Ok(None),
        Some(s) => VerificationReason::from_str(&s)
            .map(Some)
            .ok_or_else(|| StoreError::Backend(format!("unknown verification reason: {s}"))),
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        uid: row.try_get("uid").map_err(backend)?,
        email: row.try_get("email").map_err(backend)?,
        given_name: row.try_get("given_name").map_err(backend)?,
        family_name: row.try_get("family_name").map_err(backend)?,
        pac_id: row.try_get("pac_id").map_err(backend)?,
        verification_status: parse_status(
            &row.try_get::<String, _>("verification_status").map_err(backend)?,
        )?,
        verification_reason: parse_reason(row.try_get("verification_reason").map_err(backend)?)?,
        last_checked_at: opt_ts(row.try_get("last_checked_at").map_err(backend)?),
        created_at: from_ts(row.try_get("created_at").map_err(backend)?),
        updated_at: from_ts(row.try_get("updated_at").map_err(backend)?),
    })
}

fn organization_from_row(row: &SqliteRow) -> Result<ProviderOrganization, StoreError> {
    let tos_by: Option<String> = row.try_get("terms_of_service_accepted_by").map_err(backend)?;
    Ok(ProviderOrganization {
        id: ProviderOrganizationId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        npi: row.try_get("npi").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        dpc_api_organization_id: row.try_get("dpc_api_organization_id").map_err(backend)?,
        verification_status: parse_status(
            &row.try_get::<String, _>("verification_status").map_err(backend)?,
        )?,
        verification_reason: parse_reason(row.try_get("verification_reason").map_err(backend)?)?,
        last_checked_at: opt_ts(row.try_get("last_checked_at").map_err(backend)?),
        terms_of_service_accepted_at: opt_ts(
            row.try_get("terms_of_service_accepted_at").map_err(backend)?,
        ),
        terms_of_service_accepted_by: tos_by.map(|s| parse_uuid(&s).map(UserId)).transpose()?,
        config_complete: row.try_get("config_complete").map_err(backend)?,
        created_at: from_ts(row.try_get("created_at").map_err(backend)?),
        updated_at: from_ts(row.try_get("updated_at").map_err(backend)?),
    })
}

fn invitation_from_row(row: &SqliteRow) -> Result<Invitation, StoreError> {
    let type_str: String = row.try_get("invitation_type").map_err(backend)?;
    let status_str: String = row.try_get("status").map_err(backend)?;
    let invited_by: Option<String> = row.try_get("invited_by").map_err(backend)?;
    Ok(Invitation {
        id: InvitationId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        invitation_type: InvitationType::from_str(&type_str)
            .ok_or_else(|| StoreError::Backend(format!("unknown invitation type: {type_str}")))?,
        status: InvitationStatus::from_str(&status_str)
            .ok_or_else(|| StoreError::Backend(format!("unknown invitation status: {status_str}")))?,
        invited_given_name: row.try_get("invited_given_name").map_err(backend)?,
        invited_family_name: row.try_get("invited_family_name").map_err(backend)?,
        invited_phone: row.try_get("invited_phone").map_err(backend)?,
        invited_email: row.try_get("invited_email").map_err(backend)?,
        verification_code: row.try_get("verification_code").map_err(backend)?,
        failed_attempts: row.try_get::<i64, _>("failed_attempts").map_err(backend)? as i32,
        provider_organization_id: ProviderOrganizationId(parse_uuid(
            &row.try_get::<String, _>("provider_organization_id").map_err(backend)?,
        )?),
        invited_by: invited_by.map(|s| parse_uuid(&s).map(UserId)).transpose()?,
        created_at: from_ts(row.try_get("created_at").map_err(backend)?),
    })
}

fn ao_link_from_row(row: &SqliteRow) -> Result<AoOrgLink, StoreError> {
    let invitation_id: Option<String> = row.try_get("invitation_id").map_err(backend)?;
    Ok(AoOrgLink {
        id: AoOrgLinkId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        user_id: UserId(parse_uuid(&row.try_get::<String, _>("user_id").map_err(backend)?)?),
        provider_organization_id: ProviderOrganizationId(parse_uuid(
            &row.try_get::<String, _>("provider_organization_id").map_err(backend)?,
        )?),
        invitation_id: invitation_id.map(|s| parse_uuid(&s).map(InvitationId)).transpose()?,
        verification_status: parse_status(
            &row.try_get::<String, _>("verification_status").map_err(backend)?,
        )?,
        verification_reason: parse_reason(row.try_get("verification_reason").map_err(backend)?)?,
        last_checked_at: opt_ts(row.try_get("last_checked_at").map_err(backend)?),
        created_at: from_ts(row.try_get("created_at").map_err(backend)?),
    })
}

fn cd_link_from_row(row: &SqliteRow) -> Result<CdOrgLink, StoreError> {
    Ok(CdOrgLink {
        id: CdOrgLinkId(parse_uuid(&row.try_get::<String, _>("id").map_err(backend)?)?),
        user_id: UserId(parse_uuid(&row.try_get::<String, _>("user_id").map_err(backend)?)?),
        provider_organization_id: ProviderOrganizationId(parse_uuid(
            &row.try_get::<String, _>("provider_organization_id").map_err(backend)?,
        )?),
        invitation_id: InvitationId(parse_uuid(
            &row.try_get::<String, _>("invitation_id").map_err(backend)?,
        )?),
        disabled_at: opt_ts(row.try_get("disabled_at").map_err(backend)?),
        created_at: from_ts(row.try_get("created_at").map_err(backend)?),
    })
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────────── Users ─────────────────────────────────

    async fn create_user(&self, params: &CreateUserParams) -> Result<User, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users(id,uid,email,given_name,family_name,pac_id,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(&params.uid)
        .bind(&params.email)
        .bind(&params.given_name)
        .bind(&params.family_name)
        .bind(&params.pac_id)
        .bind(ts(now))
        .bind(ts(now))
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;

        self.get_user(&UserId(id)).await
    }

    async fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE id=?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_user_by_uid(&self, uid: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE uid=?")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_user_pac_id(&self, id: &UserId, pac_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET pac_id=?, updated_at=? WHERE id=? AND pac_id IS NULL")
            .bind(pac_id)
            .bind(ts(Utc::now()))
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            // Either the user is missing or already has a pac_id; only the
            // former is an error.
            self.get_user(id).await?;
        }
        Ok(())
    }

    async fn approve_user(&self, id: &UserId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET verification_status='approved', verification_reason=NULL, updated_at=?
             WHERE id=?",
        )
        .bind(ts(Utc::now()))
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn touch_user_checked(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET last_checked_at=?, updated_at=? WHERE id=?")
            .bind(ts(at))
            .bind(ts(Utc::now()))
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ───────────────────────────── Organizations ─────────────────────────────

    async fn create_organization(
        &self,
        params: &CreateOrganizationParams,
    ) -> Result<ProviderOrganization, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO provider_organizations(id,npi,name,created_at,updated_at)
             VALUES(?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(&params.npi)
        .bind(&params.name)
        .bind(ts(now))
        .bind(ts(now))
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;

        self.get_organization(&ProviderOrganizationId(id)).await
    }

    async fn get_organization(
        &self,
        id: &ProviderOrganizationId,
    ) -> Result<ProviderOrganization, StoreError> {
        let row = sqlx::query("SELECT * FROM provider_organizations WHERE id=?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => organization_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_organization_by_npi(
        &self,
        npi: &str,
    ) -> Result<Option<ProviderOrganization>, StoreError> {
        let row = sqlx::query("SELECT * FROM provider_organizations WHERE npi=?")
            .bind(npi)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(organization_from_row).transpose()
    }

    async fn approve_organization(
        &self,
        id: &ProviderOrganizationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE provider_organizations
             SET verification_status='approved', verification_reason=NULL,
                 last_checked_at=?, updated_at=?
             WHERE id=?",
        )
        .bind(ts(at))
        .bind(ts(Utc::now()))
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn organizations_to_verify(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ProviderOrganization>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM provider_organizations
             WHERE verification_status='approved'
               AND last_checked_at IS NOT NULL AND last_checked_at <= ?
             ORDER BY last_checked_at ASC
             LIMIT ?",
        )
        .bind(ts(cutoff))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(organization_from_row).collect()
    }

    async fn touch_organization_checked(
        &self,
        id: &ProviderOrganizationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE provider_organizations SET last_checked_at=?, updated_at=? WHERE id=?")
                .bind(ts(at))
                .bind(ts(Utc::now()))
                .bind(id.0.to_string())
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn reject_organization_cascade(
        &self,
        id: &ProviderOrganizationId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let now = ts(Utc::now());

        let result = sqlx::query(
            "UPDATE provider_organizations
             SET verification_status='rejected', verification_reason=?, last_checked_at=?, updated_at=?
             WHERE id=?",
        )
        .bind(reason.as_str())
        .bind(ts(at))
        .bind(now)
        .bind(id.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            "UPDATE ao_org_links
             SET verification_status='rejected', verification_reason=?, last_checked_at=?
             WHERE provider_organization_id=? AND verification_status='approved'",
        )
        .bind(reason.as_str())
        .bind(ts(at))
        .bind(id.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)
    }

    async fn accept_terms_of_service(
        &self,
        id: &ProviderOrganizationId,
        by: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE provider_organizations
             SET terms_of_service_accepted_at=?, terms_of_service_accepted_by=?, updated_at=?
             WHERE id=?",
        )
        .bind(ts(at))
        .bind(by.0.to_string())
        .bind(ts(Utc::now()))
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ────────────────────────────── Invitations ──────────────────────────────

    async fn create_invitation(
        &self,
        params: &CreateInvitationParams,
    ) -> Result<Invitation, StoreError> {
        let id = Uuid::now_v7();
        let created_at = params.created_at.unwrap_or_else(Utc::now);
        sqlx::query(
            "INSERT INTO invitations(id,invitation_type,status,invited_given_name,
                 invited_family_name,invited_phone,invited_email,verification_code,
                 provider_organization_id,invited_by,created_at)
             VALUES(?,?,'pending',?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.invitation_type.as_str())
        .bind(&params.invited_given_name)
        .bind(&params.invited_family_name)
        .bind(&params.invited_phone)
        .bind(&params.invited_email)
        .bind(&params.verification_code)
        .bind(params.provider_organization_id.0.to_string())
        .bind(params.invited_by.as_ref().map(|u| u.0.to_string()))
        .bind(ts(created_at))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        self.get_invitation(&InvitationId(id)).await
    }

    async fn get_invitation(&self, id: &InvitationId) -> Result<Invitation, StoreError> {
        let row = sqlx::query("SELECT * FROM invitations WHERE id=?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => invitation_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn pending_cd_invitation_exists(
        &self,
        organization: &ProviderOrganizationId,
        given_name: &str,
        family_name: &str,
        email: &str,
    ) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM invitations
             WHERE provider_organization_id=?
               AND invitation_type='credential_delegate'
               AND status='pending'
               AND LOWER(invited_given_name)=LOWER(?)
               AND LOWER(invited_family_name)=LOWER(?)
               AND LOWER(invited_email)=LOWER(?)",
        )
        .bind(organization.0.to_string())
        .bind(given_name)
        .bind(family_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(count > 0)
    }

    async fn accept_invitation(&self, id: &InvitationId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE invitations
             SET status='accepted', invited_given_name='', invited_family_name='',
                 invited_phone='', invited_email='', verification_code=NULL
             WHERE id=?",
        )
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn cancel_invitation(&self, id: &InvitationId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE invitations SET status='cancelled' WHERE id=? AND status='pending'")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            // Distinguish a missing invitation from a disallowed transition.
            self.get_invitation(id).await?;
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn mark_invitation_renewed(&self, id: &InvitationId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE invitations SET status='renewed' WHERE id=? AND status='pending'")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            self.get_invitation(id).await?;
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn record_failed_attempt(&self, id: &InvitationId) -> Result<i32, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE invitations SET failed_attempts = failed_attempts + 1
             WHERE id=? RETURNING failed_attempts",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        match row {
            Some((attempts,)) => Ok(attempts as i32),
            None => Err(StoreError::NotFound),
        }
    }

    // ─────────────────────────────── AO links ────────────────────────────────

    async fn create_ao_link(&self, params: &CreateAoOrgLinkParams) -> Result<AoOrgLink, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO ao_org_links(id,user_id,provider_organization_id,invitation_id,
                 verification_status,last_checked_at,created_at)
             VALUES(?,?,?,?,'approved',?,?)",
        )
        .bind(id.to_string())
        .bind(params.user_id.0.to_string())
        .bind(params.provider_organization_id.0.to_string())
        .bind(params.invitation_id.as_ref().map(|i| i.0.to_string()))
        .bind(ts(now))
        .bind(ts(now))
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;

        self.get_ao_link(&AoOrgLinkId(id)).await
    }

    async fn get_ao_link(&self, id: &AoOrgLinkId) -> Result<AoOrgLink, StoreError> {
        let row = sqlx::query("SELECT * FROM ao_org_links WHERE id=?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => ao_link_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_ao_link(
        &self,
        user: &UserId,
        organization: &ProviderOrganizationId,
    ) -> Result<Option<AoOrgLink>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM ao_org_links WHERE user_id=? AND provider_organization_id=?",
        )
        .bind(user.0.to_string())
        .bind(organization.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(ao_link_from_row).transpose()
    }

    async fn ao_links_for_user(&self, user: &UserId) -> Result<Vec<AoOrgLink>, StoreError> {
        let rows = sqlx::query("SELECT * FROM ao_org_links WHERE user_id=? ORDER BY created_at ASC")
            .bind(user.0.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(ao_link_from_row).collect()
    }

    async fn ao_links_to_verify(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<AoOrgLink>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM ao_org_links
             WHERE verification_status='approved'
               AND last_checked_at IS NOT NULL AND last_checked_at <= ?
             ORDER BY last_checked_at ASC
             LIMIT ?",
        )
        .bind(ts(cutoff))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(ao_link_from_row).collect()
    }

    async fn touch_ao_link_checked(
        &self,
        id: &AoOrgLinkId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE ao_org_links SET last_checked_at=? WHERE id=?")
            .bind(ts(at))
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn fail_ao_link(
        &self,
        id: &AoOrgLinkId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE ao_org_links
             SET verification_status='rejected', verification_reason=?, last_checked_at=?
             WHERE id=?",
        )
        .bind(reason.as_str())
        .bind(ts(at))
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn fail_ao_link_and_reject_organization(
        &self,
        id: &AoOrgLinkId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let now = ts(Utc::now());

        let row: Option<(String,)> =
            sqlx::query_as("SELECT provider_organization_id FROM ao_org_links WHERE id=?")
                .bind(id.0.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
        let Some((org_id,)) = row else {
            return Err(StoreError::NotFound);
        };

        sqlx::query(
            "UPDATE ao_org_links
             SET verification_status='rejected', verification_reason=?, last_checked_at=?
             WHERE id=?",
        )
        .bind(reason.as_str())
        .bind(ts(at))
        .bind(id.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "UPDATE provider_organizations
             SET verification_status='rejected', verification_reason=?, last_checked_at=?, updated_at=?
             WHERE id=?",
        )
        .bind(reason.as_str())
        .bind(ts(at))
        .bind(now)
        .bind(&org_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)
    }

    async fn reject_sanctioned_ao(
        &self,
        user: &UserId,
        reason: VerificationReason,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let now = ts(Utc::now());

        let result = sqlx::query(
            "UPDATE users SET verification_status='rejected', verification_reason=?, updated_at=?
             WHERE id=?",
        )
        .bind(reason.as_str())
        .bind(now)
        .bind(user.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let org_ids: Vec<(String,)> = sqlx::query_as(
            "SELECT provider_organization_id FROM ao_org_links
             WHERE user_id=? AND verification_status='approved'",
        )
        .bind(user.0.to_string())
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "UPDATE ao_org_links
             SET verification_status='rejected', verification_reason=?, last_checked_at=?
             WHERE user_id=? AND verification_status='approved'",
        )
        .bind(reason.as_str())
        .bind(ts(at))
        .bind(user.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for (org_id,) in org_ids {
            sqlx::query(
                "UPDATE provider_organizations
                 SET verification_status='rejected', verification_reason=?, last_checked_at=?, updated_at=?
                 WHERE id=?",
            )
            .bind(reason.as_str())
            .bind(ts(at))
            .bind(now)
            .bind(&org_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)
    }

    // ─────────────────────────────── CD links ────────────────────────────────

    async fn create_cd_link(&self, params: &CreateCdOrgLinkParams) -> Result<CdOrgLink, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO cd_org_links(id,user_id,provider_organization_id,invitation_id,created_at)
             VALUES(?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.user_id.0.to_string())
        .bind(params.provider_organization_id.0.to_string())
        .bind(params.invitation_id.0.to_string())
        .bind(ts(now))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let row = sqlx::query("SELECT * FROM cd_org_links WHERE id=?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        cd_link_from_row(&row)
    }

    async fn active_cd_link_exists(
        &self,
        organization: &ProviderOrganizationId,
        given_name: &str,
        family_name: &str,
        email: &str,
    ) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM cd_org_links l
             JOIN users u ON u.id = l.user_id
             WHERE l.provider_organization_id=?
               AND l.disabled_at IS NULL
               AND LOWER(u.given_name)=LOWER(?)
               AND LOWER(u.family_name)=LOWER(?)
               AND LOWER(u.email)=LOWER(?)",
        )
        .bind(organization.0.to_string())
        .bind(given_name)
        .bind(family_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(count > 0)
    }

    async fn cd_links_for_organization(
        &self,
        organization: &ProviderOrganizationId,
    ) -> Result<Vec<CdOrgLink>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM cd_org_links
             WHERE provider_organization_id=? AND disabled_at IS NULL
             ORDER BY created_at ASC",
        )
        .bind(organization.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(cd_link_from_row).collect()
    }

    async fn disable_cd_link(
        &self,
        id: &CdOrgLinkId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE cd_org_links SET disabled_at=? WHERE id=?")
            .bind(ts(at))
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
