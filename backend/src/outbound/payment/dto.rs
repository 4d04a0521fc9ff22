//! DTOs for the Stripe-compatible checkout API.
//!
//! Responses decode into these transport DTOs first, then map into domain
//! reports in one pass.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{
    PaymentEvent, PaymentEventKind, PaymentMetadata, PaymentReference, PaymentSessionRequest,
    PaymentStatusReport,
};

const SESSION_COMPLETED: &str = "checkout.session.completed";
const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
const SESSION_EVENT_PREFIX: &str = "checkout.session.";

#[derive(Debug, Deserialize)]
pub(super) struct CreatedSessionDto {
    pub(super) id: String,
    pub(super) url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SessionDto {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl SessionDto {
    pub(super) fn into_report(self) -> Result<PaymentStatusReport, String> {
        let reference = PaymentReference::new(self.id).map_err(|err| err.to_string())?;
        Ok(PaymentStatusReport {
            reference,
            paid: self.payment_status.as_deref() == Some("paid"),
            metadata: PaymentMetadata::from_map(self.metadata),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct EventDto {
    #[serde(rename = "type")]
    event_type: String,
    data: EventDataDto,
}

#[derive(Debug, Deserialize)]
struct EventDataDto {
    object: serde_json::Value,
}

impl EventDto {
    pub(super) fn into_event(self) -> Result<PaymentEvent, String> {
        let kind = match self.event_type.as_str() {
            SESSION_COMPLETED => PaymentEventKind::SessionCompleted,
            ASYNC_PAYMENT_SUCCEEDED => PaymentEventKind::AsyncPaymentSucceeded,
            _ => PaymentEventKind::Other(self.event_type.clone()),
        };
        let session = if self.event_type.starts_with(SESSION_EVENT_PREFIX) {
            let dto: SessionDto = serde_json::from_value(self.data.object)
                .map_err(|err| format!("invalid session object: {err}"))?;
            Some(dto.into_report()?)
        } else {
            None
        };
        Ok(PaymentEvent { kind, session })
    }
}

/// Flatten a session request into the provider's bracketed form encoding.
pub(super) fn session_form(request: &PaymentSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
    ];
    for (index, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{index}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            line.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount_cents.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.name.clone(),
        ));
        if let Some(image) = &line.image {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((format!("{prefix}[quantity]"), line.qty.to_string()));
    }
    for (key, value) in request.metadata.entries() {
        form.push((format!("metadata[{key}]"), value.to_owned()));
    }
    form
}
