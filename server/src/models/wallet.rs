//! Merchant wallet model. The balance column only ever holds the AEAD
//! wire form; plaintext amounts exist in memory inside the ledger engine
//! and nowhere else.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::wallets;

#[derive(Clone, Serialize, Deserialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = wallets)]
pub struct Wallet {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub currency: String,
    /// AEAD-sealed balance (minor units, decimal string plaintext).
    #[serde(skip)]
    pub encrypted_balance: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("id", &self.id)
            .field("merchant_id", &self.merchant_id)
            .field("currency", &self.currency)
            .field("encrypted_balance", &"<sealed>")
            .finish()
    }
}

impl Wallet {
    pub fn create(conn: &mut PgConnection, wallet: &Wallet) -> Result<(), ApiError> {
        diesel::insert_into(wallets::table)
            .values(wallet)
            .execute(conn)?;
        Ok(())
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Wallet>, ApiError> {
        Ok(wallets::table.find(id).first(conn).optional()?)
    }

    pub fn find_for_merchant(
        conn: &mut PgConnection,
        merchant_id: Uuid,
        currency: &str,
    ) -> Result<Option<Wallet>, ApiError> {
        Ok(wallets::table
            .filter(wallets::merchant_id.eq(merchant_id))
            .filter(wallets::currency.eq(currency))
            .first(conn)
            .optional()?)
    }

    /// `SELECT ... FOR UPDATE` by `(merchant, currency)`. Must run inside a
    /// transaction; the row lock is held until that transaction ends.
    pub fn lock_for_merchant(
        conn: &mut PgConnection,
        merchant_id: Uuid,
        currency: &str,
    ) -> Result<Option<Wallet>, ApiError> {
        Ok(wallets::table
            .filter(wallets::merchant_id.eq(merchant_id))
            .filter(wallets::currency.eq(currency))
            .for_update()
            .first(conn)
            .optional()?)
    }

    /// `SELECT ... FOR UPDATE` by wallet id. Must run inside a transaction.
    pub fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Wallet>, ApiError> {
        Ok(wallets::table
            .find(id)
            .for_update()
            .first(conn)
            .optional()?)
    }

    pub fn update_balance(
        conn: &mut PgConnection,
        id: Uuid,
        encrypted_balance: &str,
    ) -> Result<(), ApiError> {
        let updated = diesel::update(wallets::table.find(id))
            .set((
                wallets::encrypted_balance.eq(encrypted_balance),
                wallets::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(ApiError::NotFound("wallet"));
        }
        Ok(())
    }
}
