//! Checkout sessions held in memory.

use async_trait::async_trait;

use crate::domain::ports::{CheckoutSessionRepository, CheckoutSessionRepositoryError};
use crate::domain::{CheckoutSession, CheckoutSessionStatus, OrderId, PaymentReference};

use super::MemoryStore;

#[async_trait]
impl CheckoutSessionRepository for MemoryStore {
    async fn save(&self, session: &CheckoutSession) -> Result<(), CheckoutSessionRepositoryError> {
        self.with_state(CheckoutSessionRepositoryError::connection, |state| {
            let key = session.reference.as_ref().to_owned();
            if state.checkout_sessions.contains_key(&key) {
                return Err(CheckoutSessionRepositoryError::query(
                    "checkout session already stored",
                ));
            }
            state.checkout_sessions.insert(key, session.clone());
            Ok(())
        })
    }

    async fn find(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<CheckoutSession>, CheckoutSessionRepositoryError> {
        self.with_state(CheckoutSessionRepositoryError::connection, |state| {
            Ok(state.checkout_sessions.get(reference.as_ref()).cloned())
        })
    }

    async fn mark_completed(
        &self,
        reference: &PaymentReference,
        order_id: &OrderId,
    ) -> Result<(), CheckoutSessionRepositoryError> {
        self.with_state(CheckoutSessionRepositoryError::connection, |state| {
            if let Some(session) = state.checkout_sessions.get_mut(reference.as_ref()) {
                session.status = CheckoutSessionStatus::Completed;
                session.order_id = Some(order_id.clone());
            }
            Ok(())
        })
    }
}
