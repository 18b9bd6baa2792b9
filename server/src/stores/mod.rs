pub mod pg;

pub use pg::{PgLedgerStore, PgMerchantDirectory, PgWebhookDeliveryStore};
