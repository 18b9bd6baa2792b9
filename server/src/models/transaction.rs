//! Transaction ledger entries.
//!
//! Rows are append-only with two sanctioned mutations: `PENDING -> SUCCESS |
//! FAILED` during processing, and `SUCCESS -> REVERSED` on a payment when a
//! refund commits. The plaintext `amount` column exists for aggregation;
//! `amount_encrypted` is the sealed record.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Timestamptz, Uuid as SqlUuid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::transactions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    Refund,
    Topup,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::Refund => "REFUND",
            Self::Topup => "TOPUP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Reversed => "REVERSED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = transactions)]
pub struct Transaction {
    pub id: Uuid,
    pub reference_id: String,
    pub merchant_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    /// Sealed copy of the amount. Not part of the client-visible record.
    #[serde(skip)]
    pub amount_encrypted: String,
    pub transaction_type: String,
    pub status: String,
    /// Request signature that authorized this movement.
    #[serde(skip)]
    pub signature: String,
    pub client_ip: String,
    pub extra_data: Option<String>,
    pub original_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn is_refundable(&self) -> bool {
        self.transaction_type == TransactionType::Payment.as_str()
            && self.status == TransactionStatus::Success.as_str()
    }

    pub fn insert(conn: &mut PgConnection, txn: &Transaction) -> Result<(), ApiError> {
        diesel::insert_into(transactions::table)
            .values(txn)
            .execute(conn)?;
        Ok(())
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Transaction>, ApiError> {
        Ok(transactions::table.find(id).first(conn).optional()?)
    }

    pub fn find_by_reference(
        conn: &mut PgConnection,
        merchant_id: Uuid,
        reference_id: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        Ok(transactions::table
            .filter(transactions::merchant_id.eq(merchant_id))
            .filter(transactions::reference_id.eq(reference_id))
            .first(conn)
            .optional()?)
    }

    pub fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), ApiError> {
        let updated = diesel::update(transactions::table.find(id))
            .set((
                transactions::status.eq(status.as_str()),
                transactions::processed_at.eq(Some(Utc::now())),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(ApiError::NotFound("transaction"));
        }
        Ok(())
    }

    /// Any non-failed refund already linked to this original?
    pub fn refund_exists(
        conn: &mut PgConnection,
        original_transaction_id: Uuid,
    ) -> Result<bool, ApiError> {
        let exists: bool = diesel::select(diesel::dsl::exists(
            transactions::table
                .filter(transactions::original_transaction_id.eq(original_transaction_id))
                .filter(transactions::transaction_type.eq(TransactionType::Refund.as_str()))
                .filter(transactions::status.ne(TransactionStatus::Failed.as_str())),
        ))
        .get_result(conn)?;
        Ok(exists)
    }

    pub fn list(
        conn: &mut PgConnection,
        params: &TransactionListParams,
    ) -> Result<(Vec<Transaction>, i64), ApiError> {
        let mut count_query = transactions::table
            .filter(transactions::merchant_id.eq(params.merchant_id))
            .into_boxed();
        let mut data_query = transactions::table
            .filter(transactions::merchant_id.eq(params.merchant_id))
            .into_boxed();

        if let Some(status) = params.status {
            count_query = count_query.filter(transactions::status.eq(status.as_str()));
            data_query = data_query.filter(transactions::status.eq(status.as_str()));
        }
        if let Some(tx_type) = params.transaction_type {
            count_query =
                count_query.filter(transactions::transaction_type.eq(tx_type.as_str()));
            data_query = data_query.filter(transactions::transaction_type.eq(tx_type.as_str()));
        }
        if let Some(from) = params.from {
            count_query = count_query.filter(transactions::created_at.ge(from));
            data_query = data_query.filter(transactions::created_at.ge(from));
        }
        if let Some(to) = params.to {
            count_query = count_query.filter(transactions::created_at.le(to));
            data_query = data_query.filter(transactions::created_at.le(to));
        }

        let total: i64 = count_query.count().get_result(conn)?;

        let offset = (params.page.max(1) - 1) * params.page_size;
        let items = data_query
            .order(transactions::created_at.desc())
            .limit(params.page_size)
            .offset(offset)
            .load(conn)?;

        Ok((items, total))
    }

    pub fn stats(
        conn: &mut PgConnection,
        merchant_id: Uuid,
        period_start: Option<DateTime<Utc>>,
    ) -> Result<TransactionStats, ApiError> {
        const BASE: &str = "SELECT COUNT(*) AS total_transactions, \
            COUNT(*) FILTER (WHERE status = 'SUCCESS') AS successful, \
            COUNT(*) FILTER (WHERE status = 'FAILED') AS failed, \
            COUNT(*) FILTER (WHERE status = 'REVERSED') AS reversed, \
            COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'PAYMENT' AND status = 'SUCCESS'), 0)::BIGINT AS total_revenue, \
            COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'REFUND' AND status = 'SUCCESS'), 0)::BIGINT AS total_refunded, \
            COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'TOPUP' AND status = 'SUCCESS'), 0)::BIGINT AS total_topup \
            FROM transactions WHERE merchant_id = $1";

        let stats = match period_start {
            Some(start) => diesel::sql_query(format!("{BASE} AND created_at >= $2"))
                .bind::<SqlUuid, _>(merchant_id)
                .bind::<Timestamptz, _>(start)
                .get_result(conn)?,
            None => diesel::sql_query(BASE)
                .bind::<SqlUuid, _>(merchant_id)
                .get_result(conn)?,
        };
        Ok(stats)
    }
}

/// Filters + pagination for the dashboard transaction listing.
#[derive(Debug, Clone)]
pub struct TransactionListParams {
    pub merchant_id: Uuid,
    pub status: Option<TransactionStatus>,
    pub transaction_type: Option<TransactionType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize, QueryableByName)]
pub struct TransactionStats {
    #[diesel(sql_type = BigInt)]
    pub total_transactions: i64,
    #[diesel(sql_type = BigInt)]
    pub successful: i64,
    #[diesel(sql_type = BigInt)]
    pub failed: i64,
    #[diesel(sql_type = BigInt)]
    pub reversed: i64,
    #[diesel(sql_type = BigInt)]
    pub total_revenue: i64,
    #[diesel(sql_type = BigInt)]
    pub total_refunded: i64,
    #[diesel(sql_type = BigInt)]
    pub total_topup: i64,
}
