//! Background receipt delivery.
//!
//! [`ReceiptDispatcher`] implements the `ReceiptNotifier` port by queuing order
//! ids on a bounded channel; [`ReceiptWorker`] drains the channel, renders the
//! receipt and hands it to a `ReceiptMailer`.

mod dispatcher;

pub use dispatcher::{
    DEFAULT_RECEIPT_QUEUE_CAPACITY, DeliveryError, DeliveryOutcome, ReceiptDelivery,
    ReceiptDispatcher, ReceiptWorker, receipt_channel,
};
