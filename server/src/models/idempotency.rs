//! Durable idempotency log.
//!
//! One row per committed business intent, written in the same database
//! transaction as its effect. Rows are never updated.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::idempotency_logs;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = idempotency_logs)]
pub struct IdempotencyLog {
    pub key: String,
    pub transaction_id: Uuid,
    pub response_json: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyLog {
    pub fn insert(conn: &mut PgConnection, log: &IdempotencyLog) -> Result<(), ApiError> {
        diesel::insert_into(idempotency_logs::table)
            .values(log)
            .execute(conn)?;
        Ok(())
    }

    pub fn find(conn: &mut PgConnection, key: &str) -> Result<Option<IdempotencyLog>, ApiError> {
        Ok(idempotency_logs::table.find(key).first(conn).optional()?)
    }
}

/// Key for payments and top-ups carrying a merchant reference.
pub fn payment_key(merchant_id: Uuid, reference_id: &str) -> String {
    format!("{merchant_id}:{reference_id}")
}

/// Key for refunds, namespaced so a refund never collides with its original.
pub fn refund_key(merchant_id: Uuid, original_reference_id: &str) -> String {
    format!("{merchant_id}:refund:{original_reference_id}")
}
