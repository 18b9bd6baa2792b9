pub mod auth;
pub mod dashboard;
pub mod health;
pub mod merchants;
pub mod payments;
pub mod wallets;

use serde::Serialize;

use crate::models::Transaction;

/// Client-visible transaction record.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub reference_id: String,
    pub amount: i64,
    pub transaction_type: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

impl From<&Transaction> for TransactionResponse {
    fn from(txn: &Transaction) -> Self {
        Self {
            id: txn.id.to_string(),
            reference_id: txn.reference_id.clone(),
            amount: txn.amount,
            transaction_type: txn.transaction_type.clone(),
            status: txn.status.clone(),
            created_at: txn.created_at.to_rfc3339(),
            processed_at: txn.processed_at.map(|t| t.to_rfc3339()),
        }
    }
}
