//! Mail delivery adapters.
//!
//! Receipts leave through an HTTP mail relay that accepts one JSON message per
//! request.

mod relay;

pub use relay::{MailRelayConfig, RelayReceiptMailer};
