//! Port for handing confirmed orders to the receipt dispatcher.
//!
//! Notification is best effort: implementations must return immediately and
//! never fail the caller.

use crate::domain::OrderId;

/// Fire-and-forget receipt requests.
#[cfg_attr(test, mockall::automock)]
pub trait ReceiptNotifier: Send + Sync {
    /// Queue a receipt for an order.
    fn notify(&self, order_id: &OrderId);
}

/// Notifier that discards every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpReceiptNotifier;

impl ReceiptNotifier for NoOpReceiptNotifier {
    fn notify(&self, _order_id: &OrderId) {}
}
