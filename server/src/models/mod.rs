pub mod idempotency;
pub mod merchant;
pub mod transaction;
pub mod wallet;
pub mod webhook_delivery;

pub use idempotency::IdempotencyLog;
pub use merchant::{Merchant, MerchantStatus};
pub use transaction::{
    Transaction, TransactionListParams, TransactionStats, TransactionStatus, TransactionType,
};
pub use wallet::Wallet;
pub use webhook_delivery::{DeliveryStatus, WebhookDelivery};
