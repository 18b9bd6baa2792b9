//! Merchant account model.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::merchants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MerchantStatus {
    Active,
    Suspended,
    Deactivated,
}

impl MerchantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Deactivated => "DEACTIVATED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Active,
            "SUSPENDED" => Self::Suspended,
            _ => Self::Deactivated,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = merchants)]
pub struct Merchant {
    pub id: Uuid,
    pub username: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub merchant_name: String,
    pub access_key: String,
    /// AEAD-sealed secret key. Never serialized.
    #[serde(skip)]
    pub secret_key_enc: String,
    pub webhook_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Debug impl that redacts credential material.
impl std::fmt::Debug for Merchant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merchant")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("access_key", &self.access_key)
            .field("secret_key_enc", &"<redacted>")
            .field("webhook_url", &self.webhook_url)
            .field("status", &self.status)
            .finish()
    }
}

impl Merchant {
    pub fn is_active(&self) -> bool {
        MerchantStatus::parse(&self.status) == MerchantStatus::Active
    }

    pub fn create(conn: &mut PgConnection, merchant: &Merchant) -> Result<(), ApiError> {
        diesel::insert_into(merchants::table)
            .values(merchant)
            .execute(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => ApiError::UsernameExists,
                other => ApiError::Internal(anyhow::Error::new(other)),
            })?;
        Ok(())
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Merchant>, ApiError> {
        Ok(merchants::table.find(id).first(conn).optional()?)
    }

    pub fn find_by_access_key(
        conn: &mut PgConnection,
        access_key: &str,
    ) -> Result<Option<Merchant>, ApiError> {
        Ok(merchants::table
            .filter(merchants::access_key.eq(access_key))
            .first(conn)
            .optional()?)
    }

    pub fn find_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> Result<Option<Merchant>, ApiError> {
        Ok(merchants::table
            .filter(merchants::username.eq(username))
            .first(conn)
            .optional()?)
    }

    pub fn update_webhook_url(
        conn: &mut PgConnection,
        id: Uuid,
        webhook_url: Option<&str>,
    ) -> Result<(), ApiError> {
        let updated = diesel::update(merchants::table.find(id))
            .set((
                merchants::webhook_url.eq(webhook_url),
                merchants::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(ApiError::NotFound("merchant"));
        }
        Ok(())
    }

    pub fn update_keys(
        conn: &mut PgConnection,
        id: Uuid,
        access_key: &str,
        secret_key_enc: &str,
    ) -> Result<(), ApiError> {
        let updated = diesel::update(merchants::table.find(id))
            .set((
                merchants::access_key.eq(access_key),
                merchants::secret_key_enc.eq(secret_key_enc),
                merchants::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(ApiError::NotFound("merchant"));
        }
        Ok(())
    }
}
