pub mod auth;
pub mod idempotency;
pub mod ledger;
pub mod merchant;
pub mod reporting;
pub mod webhook;

pub use auth::AuthService;
pub use ledger::{LedgerService, PaymentRequest, RefundRequest, TopupRequest};
pub use merchant::MerchantService;
pub use reporting::ReportingService;
pub use webhook::WebhookNotifier;
