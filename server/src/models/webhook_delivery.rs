//! Webhook delivery log.
//!
//! One row per enqueued transaction; updated after every delivery attempt
//! and terminal at DELIVERED or FAILED.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::webhook_deliveries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = webhook_deliveries)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub merchant_id: Uuid,
    pub webhook_url: String,
    pub payload: String,
    pub http_status: Option<i32>,
    /// 1-based attempt counter; 0 until the first attempt starts.
    pub attempt: i32,
    pub status: String,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookDelivery {
    pub fn new(transaction_id: Uuid, merchant_id: Uuid, url: String, payload: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            merchant_id,
            webhook_url: url,
            payload,
            http_status: None,
            attempt: 0,
            status: DeliveryStatus::Pending.as_str().to_string(),
            next_retry_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn insert(conn: &mut PgConnection, log: &WebhookDelivery) -> Result<(), ApiError> {
        diesel::insert_into(webhook_deliveries::table)
            .values(log)
            .execute(conn)?;
        Ok(())
    }

    /// Persist the current attempt state over the existing row.
    pub fn save(conn: &mut PgConnection, log: &WebhookDelivery) -> Result<(), ApiError> {
        diesel::update(webhook_deliveries::table.find(log.id))
            .set((
                webhook_deliveries::http_status.eq(log.http_status),
                webhook_deliveries::attempt.eq(log.attempt),
                webhook_deliveries::status.eq(log.status.as_str()),
                webhook_deliveries::next_retry_at.eq(log.next_retry_at),
                webhook_deliveries::last_error.eq(log.last_error.as_deref()),
                webhook_deliveries::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_delivery_starts_pending_with_zero_attempts() {
        let d = WebhookDelivery::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "https://example.com/hook".into(),
            "{}".into(),
        );
        assert_eq!(d.status, "PENDING");
        assert_eq!(d.attempt, 0);
        assert!(d.http_status.is_none());
        assert!(d.next_retry_at.is_none());
    }
}
