//! Checkout and payment confirmation.
//!
//! Opening a checkout freezes the priced cart. Without a payment provider the
//! order is created on the spot under a simulated reference; with one, the
//! snapshot is persisted and the order only appears once the provider reports
//! the session as paid, through either the webhook or the confirm poll. Both
//! routes share [`CheckoutService::finalize`], and the unique payment
//! reference on orders makes repeated confirmation a no-op.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::idempotent_mutation::{IdempotentMutationContext, IdempotentMutationRunner};
use super::port_error_mapping::{
    map_cart_error, map_gateway_error, map_order_error, map_session_error, map_user_error,
};
use super::ports::{
    CartRepository, CheckoutCommand, CheckoutSessionRepository, OrderRepository,
    OrderRepositoryError, PaymentGateway, ReceiptNotifier, StartCheckoutRequest, UserDirectory,
};
use super::{
    AuthContext, CheckoutError, CheckoutSession, CheckoutSessionStatus, CheckoutSnapshot,
    CheckoutStart, ConfirmationOutcome, Error, MutationType, OrderId, OrderValidationError,
    PaymentEventKind, PaymentMetadata, PaymentReference, PaymentSessionRequest,
    PaymentStatusReport, Totals, UserId,
};

/// Placeholder the provider substitutes with its session id on redirect.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Storefront URLs used to build redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    web_url: String,
}

impl CheckoutSettings {
    /// Settings for a storefront served from `web_url`.
    pub fn new(web_url: impl AsRef<str>) -> Self {
        Self {
            web_url: web_url.as_ref().trim_end_matches('/').to_owned(),
        }
    }

    fn simulated_redirect(&self, order_id: &OrderId) -> String {
        format!("{}/orders/{order_id}?simulated=1", self.web_url)
    }

    fn success_url(&self) -> String {
        format!("{}/orders?paid=1&sid={SESSION_ID_PLACEHOLDER}", self.web_url)
    }

    fn cancel_url(&self) -> String {
        format!("{}/cart", self.web_url)
    }
}

/// Collaborators of [`CheckoutService`].
#[derive(Clone)]
pub struct CheckoutServicePorts {
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub sessions: Arc<dyn CheckoutSessionRepository>,
    pub users: Arc<dyn UserDirectory>,
    /// Hosted payment provider; `None` selects the simulated path.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub notifier: Arc<dyn ReceiptNotifier>,
}

/// Checkout service implementing [`CheckoutCommand`].
#[derive(Clone)]
pub struct CheckoutService {
    ports: CheckoutServicePorts,
    idempotency: IdempotentMutationRunner,
    clock: Arc<dyn Clock>,
    settings: CheckoutSettings,
}

fn map_checkout_error(error: CheckoutError) -> Error {
    match error {
        CheckoutError::EmptyCart => Error::invalid_request("cart is empty")
            .with_details(json!({ "code": "empty_cart" })),
        CheckoutError::Pricing(err) => Error::internal(format!("failed to price cart: {err}")),
    }
}

fn map_order_validation(error: OrderValidationError) -> Error {
    Error::internal(format!("checkout snapshot cannot form an order: {error}"))
}

impl CheckoutService {
    /// Create the service.
    pub fn new(
        ports: CheckoutServicePorts,
        idempotency: IdempotentMutationRunner,
        clock: Arc<dyn Clock>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            ports,
            idempotency,
            clock,
            settings,
        }
    }

    async fn open_checkout(&self, auth: AuthContext) -> Result<CheckoutStart, Error> {
        let lines = self
            .ports
            .carts
            .list_for_user(auth.user_id())
            .await
            .map_err(map_cart_error)?;
        let snapshot =
            CheckoutSnapshot::price(auth.user_id().clone(), &lines).map_err(map_checkout_error)?;
        match &self.ports.gateway {
            Some(gateway) => self.open_hosted(gateway.as_ref(), snapshot).await,
            None => self.settle_simulated(snapshot).await,
        }
    }

    async fn settle_simulated(&self, snapshot: CheckoutSnapshot) -> Result<CheckoutStart, Error> {
        let reference = PaymentReference::simulated();
        let order = snapshot
            .to_new_order(reference.clone(), snapshot.totals)
            .map_err(map_order_validation)?;
        let order_id = self
            .ports
            .orders
            .create(&order)
            .await
            .map_err(map_order_error)?;
        self.release_cart_lines(&snapshot).await?;
        self.ports.notifier.notify(&order_id);
        info!(
            %order_id,
            %reference,
            total_cents = snapshot.totals.total_cents,
            "simulated checkout created order"
        );
        Ok(CheckoutStart {
            reference,
            redirect_url: self.settings.simulated_redirect(&order_id),
            order_id: Some(order_id),
            totals: snapshot.totals,
        })
    }

    async fn open_hosted(
        &self,
        gateway: &dyn PaymentGateway,
        snapshot: CheckoutSnapshot,
    ) -> Result<CheckoutStart, Error> {
        let identifier = self
            .ports
            .users
            .find_by_id(&snapshot.user_id)
            .await
            .map_err(map_user_error)?
            .and_then(|user| user.email().or(user.phone()).map(str::to_owned));
        let metadata =
            PaymentMetadata::for_checkout(&snapshot.user_id, identifier.as_deref(), snapshot.totals);
        let request = PaymentSessionRequest::from_snapshot(
            &snapshot,
            metadata,
            self.settings.success_url(),
            self.settings.cancel_url(),
        );
        let session = gateway
            .create_session(&request)
            .await
            .map_err(map_gateway_error)?;
        let totals = snapshot.totals;
        self.ports
            .sessions
            .save(&CheckoutSession {
                reference: session.reference.clone(),
                snapshot,
                status: CheckoutSessionStatus::Open,
                order_id: None,
                created_at: self.clock.utc(),
            })
            .await
            .map_err(map_session_error)?;
        info!(reference = %session.reference, "checkout session opened");
        Ok(CheckoutStart {
            reference: session.reference,
            redirect_url: session.redirect_url,
            order_id: None,
            totals,
        })
    }

    async fn release_cart_lines(&self, snapshot: &CheckoutSnapshot) -> Result<(), Error> {
        let removed = self
            .ports
            .carts
            .delete_many(&snapshot.user_id, &snapshot.cart_item_ids())
            .await
            .map_err(map_cart_error)?;
        debug!(removed, user_id = %snapshot.user_id, "checked-out cart lines removed");
        Ok(())
    }

    async fn resolve_payer(&self, metadata: &PaymentMetadata) -> Result<Option<UserId>, Error> {
        if let Some(user_id) = metadata.user_id() {
            return Ok(Some(user_id));
        }
        let Some(identifier) = metadata.identifier() else {
            return Ok(None);
        };
        let user = self
            .ports
            .users
            .find_by_contact(identifier)
            .await
            .map_err(map_user_error)?;
        Ok(user.map(|user| user.id().clone()))
    }

    async fn existing_order(&self, reference: &PaymentReference) -> Result<Option<OrderId>, Error> {
        self.ports
            .orders
            .find_by_reference(reference)
            .await
            .map_err(map_order_error)
    }

    /// Materialise the snapshot behind a paid provider session.
    async fn finalize(&self, report: &PaymentStatusReport) -> Result<ConfirmationOutcome, Error> {
        let reference = &report.reference;
        let Some(session) = self
            .ports
            .sessions
            .find(reference)
            .await
            .map_err(map_session_error)?
        else {
            if let Some(order_id) = self.existing_order(reference).await? {
                return Ok(ConfirmationOutcome::AlreadyProcessed(order_id));
            }
            error!(%reference, "paid session has no checkout snapshot");
            return Ok(ConfirmationOutcome::Ignored);
        };
        if let (CheckoutSessionStatus::Completed, Some(order_id)) =
            (session.status, session.order_id.as_ref())
        {
            return Ok(ConfirmationOutcome::AlreadyProcessed(order_id.clone()));
        }

        let Some(payer) = self.resolve_payer(&report.metadata).await? else {
            error!(%reference, "cannot resolve the paying user");
            return Ok(ConfirmationOutcome::Ignored);
        };
        if payer != session.snapshot.user_id {
            error!(
                %reference,
                payer = %payer,
                owner = %session.snapshot.user_id,
                "paying user does not own the checkout snapshot"
            );
            return Ok(ConfirmationOutcome::Ignored);
        }

        let snapshot = &session.snapshot;
        let totals = report
            .metadata
            .discount_cents()
            .and_then(|discount| Totals::with_discount(snapshot.totals.subtotal_cents, discount))
            .unwrap_or(snapshot.totals);
        let order = snapshot
            .to_new_order(reference.clone(), totals)
            .map_err(map_order_validation)?;
        let (order_id, created) = match self.ports.orders.create(&order).await {
            Ok(order_id) => (order_id, true),
            Err(OrderRepositoryError::DuplicateReference { .. }) => {
                let order_id = self.existing_order(reference).await?.ok_or_else(|| {
                    Error::internal("order vanished after duplicate payment reference")
                })?;
                (order_id, false)
            }
            Err(err) => return Err(map_order_error(err)),
        };

        self.release_cart_lines(snapshot).await?;
        self.ports
            .sessions
            .mark_completed(reference, &order_id)
            .await
            .map_err(map_session_error)?;

        // The session was still open, so no earlier attempt got as far as the
        // receipt.
        self.ports.notifier.notify(&order_id);
        if !created {
            info!(%order_id, %reference, "completed an order left open by an earlier attempt");
            return Ok(ConfirmationOutcome::AlreadyProcessed(order_id));
        }
        info!(%order_id, %reference, total_cents = totals.total_cents, "payment confirmed");
        Ok(ConfirmationOutcome::Fulfilled(order_id))
    }
}

#[async_trait]
impl CheckoutCommand for CheckoutService {
    async fn start_checkout(&self, request: StartCheckoutRequest) -> Result<CheckoutStart, Error> {
        let StartCheckoutRequest {
            auth,
            idempotency_key,
        } = request;
        let context = IdempotentMutationContext::new(
            MutationType::CheckoutSessions,
            idempotency_key,
            auth.user_id().clone(),
            &json!({}),
        )?;
        self.idempotency
            .run(context, || self.open_checkout(auth))
            .await
    }

    async fn confirm_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<ConfirmationOutcome, Error> {
        let Some(gateway) = &self.ports.gateway else {
            return match self.existing_order(reference).await? {
                Some(order_id) => Ok(ConfirmationOutcome::AlreadyProcessed(order_id)),
                None => Err(Error::invalid_request(
                    "payment provider is not configured",
                )),
            };
        };
        let report = gateway
            .retrieve_session(reference)
            .await
            .map_err(map_gateway_error)?;
        if !report.paid {
            return Err(Error::invalid_request("payment not completed"));
        }
        self.finalize(&report).await
    }

    async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<String>,
    ) -> Result<ConfirmationOutcome, Error> {
        let Some(gateway) = &self.ports.gateway else {
            return Err(Error::invalid_request("payment webhooks are not configured"));
        };
        let Some(header) = signature.filter(|value| !value.trim().is_empty()) else {
            return Err(Error::invalid_request("missing webhook signature"));
        };
        let event = gateway
            .verify_event(payload, &header)
            .map_err(map_gateway_error)?;
        match (event.kind, event.session) {
            (
                PaymentEventKind::SessionCompleted | PaymentEventKind::AsyncPaymentSucceeded,
                Some(report),
            ) if report.paid => self.finalize(&report).await,
            (PaymentEventKind::SessionCompleted, Some(report)) => {
                debug!(reference = %report.reference, "checkout completed with payment pending");
                Ok(ConfirmationOutcome::Ignored)
            }
            (kind, _) => {
                if matches!(kind, PaymentEventKind::AsyncPaymentSucceeded) {
                    warn!("payment success event without a paid session");
                } else {
                    debug!(?kind, "payment event ignored");
                }
                Ok(ConfirmationOutcome::Ignored)
            }
        }
    }
}

#[cfg(test)]
#[path = "checkout_service_tests.rs"]
mod tests;
