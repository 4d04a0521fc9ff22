//! Bounded receipt queue and its delivery task.
//!
//! Each queued receipt carries the [`TraceId`] of the request that placed the
//! order so delivery logs and errors correlate with it.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::domain::ports::{
    OrderRepository, OrderRepositoryError, ReceiptMailer, ReceiptMailerError, ReceiptNotifier,
    UserDirectory, UserDirectoryError,
};
use crate::domain::{OrderId, ReceiptMessage, TraceId, compose_receipt};

/// Queue depth used when none is configured.
pub const DEFAULT_RECEIPT_QUEUE_CAPACITY: usize = 256;

/// Sending half of the receipt queue.
#[derive(Debug, Clone)]
pub struct ReceiptDispatcher {
    sender: mpsc::Sender<QueuedReceipt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedReceipt {
    order_id: OrderId,
    trace_id: TraceId,
}

impl ReceiptNotifier for ReceiptDispatcher {
    fn notify(&self, order_id: &OrderId) {
        let queued = QueuedReceipt {
            order_id: order_id.clone(),
            trace_id: TraceId::current_or_generate(),
        };
        match self.sender.try_send(queued) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => warn!(
                order_id = %dropped.order_id,
                trace_id = %dropped.trace_id,
                "receipt queue full; receipt dropped"
            ),
            Err(TrySendError::Closed(dropped)) => warn!(
                order_id = %dropped.order_id,
                trace_id = %dropped.trace_id,
                "receipt worker stopped; receipt dropped"
            ),
        }
    }
}

/// What happened to one queued receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The mailer accepted the message.
    Sent,
    /// The order no longer exists.
    OrderMissing,
    /// The owner has no email address on file.
    NoRecipient,
}

/// Failures while delivering a receipt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Loading the order failed.
    #[error(transparent)]
    Orders(#[from] OrderRepositoryError),
    /// Loading the recipient failed.
    #[error(transparent)]
    Users(#[from] UserDirectoryError),
    /// The mailer refused or could not be reached.
    #[error(transparent)]
    Mail(#[from] ReceiptMailerError),
}

/// Loads, renders and sends one receipt.
pub struct ReceiptDelivery {
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn ReceiptMailer>,
    web_url: String,
}

impl ReceiptDelivery {
    /// Bundle the delivery ports. `web_url` prefixes the "View order" link.
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn ReceiptMailer>,
        web_url: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            users,
            mailer,
            web_url: web_url.into(),
        }
    }

    /// Deliver the receipt for `order_id`.
    ///
    /// # Errors
    /// Returns [`DeliveryError`] when a port fails.
    pub async fn deliver(&self, order_id: &OrderId) -> Result<DeliveryOutcome, DeliveryError> {
        let Some(order) = self.orders.find_by_id(order_id).await? else {
            return Ok(DeliveryOutcome::OrderMissing);
        };
        let Some(user) = self.users.find_by_id(&order.user_id).await? else {
            return Ok(DeliveryOutcome::NoRecipient);
        };
        let Some(email) = user.email() else {
            return Ok(DeliveryOutcome::NoRecipient);
        };
        let message = ReceiptMessage {
            to: email.to_owned(),
            content: compose_receipt(&order, Some(user.display_name()), &self.web_url),
        };
        self.mailer.send(&message).await?;
        Ok(DeliveryOutcome::Sent)
    }
}

/// Receiving half of the receipt queue.
pub struct ReceiptWorker {
    receiver: mpsc::Receiver<QueuedReceipt>,
    delivery: ReceiptDelivery,
}

/// Create a dispatcher and the worker draining it.
#[must_use]
pub fn receipt_channel(
    capacity: usize,
    delivery: ReceiptDelivery,
) -> (ReceiptDispatcher, ReceiptWorker) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        ReceiptDispatcher { sender },
        ReceiptWorker { receiver, delivery },
    )
}

impl ReceiptWorker {
    /// Deliver queued receipts until `shutdown` flips to `true`, its sender
    /// is dropped, or every dispatcher is gone.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("receipt worker started");
        while !*shutdown.borrow() {
            tokio::select! {
                received = self.receiver.recv() => {
                    let Some(queued) = received else { break };
                    TraceId::scope(queued.trace_id, self.handle(&queued.order_id)).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("receipt worker stopped");
    }

    async fn handle(&self, order_id: &OrderId) {
        let trace_id = TraceId::current().map(|id| id.to_string()).unwrap_or_default();
        match self.delivery.deliver(order_id).await {
            Ok(DeliveryOutcome::Sent) => debug!(%order_id, %trace_id, "receipt sent"),
            Ok(DeliveryOutcome::OrderMissing) => {
                debug!(%order_id, %trace_id, "receipt skipped: order missing");
            }
            Ok(DeliveryOutcome::NoRecipient) => {
                debug!(%order_id, %trace_id, "receipt skipped: no email on file");
            }
            Err(error) => warn!(%order_id, %trace_id, %error, "receipt delivery failed"),
        }
    }
}
