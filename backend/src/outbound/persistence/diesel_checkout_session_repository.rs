//! PostgreSQL-backed `CheckoutSessionRepository` implementation.
//!
//! The priced snapshot is stored as JSONB so a confirmation arriving hours
//! later rebuilds exactly the cart that was charged.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CheckoutSessionRepository, CheckoutSessionRepositoryError};
use crate::domain::{
    CheckoutSession, CheckoutSessionStatus, CheckoutSnapshot, OrderId, PaymentReference,
};

use super::diesel_error_mapping::{map_basic_diesel_error, pool_error_message};
use super::models::{CheckoutSessionRow, NewCheckoutSessionRow};
use super::pool::{DbPool, PoolError};
use super::schema::checkout_sessions;

/// Diesel-backed checkout session storage.
#[derive(Clone)]
pub struct DieselCheckoutSessionRepository {
    pool: DbPool,
}

impl DieselCheckoutSessionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CheckoutSessionRepositoryError {
    CheckoutSessionRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> CheckoutSessionRepositoryError {
    map_basic_diesel_error(
        error,
        CheckoutSessionRepositoryError::query,
        CheckoutSessionRepositoryError::connection,
    )
}

fn parse_status(raw: &str) -> Result<CheckoutSessionStatus, CheckoutSessionRepositoryError> {
    [CheckoutSessionStatus::Open, CheckoutSessionStatus::Completed]
        .into_iter()
        .find(|status| status.as_str() == raw)
        .ok_or_else(|| {
            CheckoutSessionRepositoryError::serialization(format!("unknown session status {raw}"))
        })
}

fn to_session(row: CheckoutSessionRow) -> Result<CheckoutSession, CheckoutSessionRepositoryError> {
    let snapshot: CheckoutSnapshot = serde_json::from_value(row.snapshot)
        .map_err(|err| CheckoutSessionRepositoryError::serialization(err.to_string()))?;
    let reference = PaymentReference::new(row.payment_reference)
        .map_err(|err| CheckoutSessionRepositoryError::serialization(err.to_string()))?;
    Ok(CheckoutSession {
        reference,
        snapshot,
        status: parse_status(&row.status)?,
        order_id: row.order_id.map(OrderId::from_uuid),
        created_at: row.created_at,
    })
}

#[async_trait]
impl CheckoutSessionRepository for DieselCheckoutSessionRepository {
    async fn save(&self, session: &CheckoutSession) -> Result<(), CheckoutSessionRepositoryError> {
        let snapshot = serde_json::to_value(&session.snapshot)
            .map_err(|err| CheckoutSessionRepositoryError::serialization(err.to_string()))?;
        let new_row = NewCheckoutSessionRow {
            payment_reference: session.reference.as_ref(),
            user_id: *session.snapshot.user_id.as_uuid(),
            snapshot,
            status: session.status.as_str(),
            order_id: session.order_id.as_ref().map(|id| *id.as_uuid()),
            created_at: session.created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(checkout_sessions::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<CheckoutSession>, CheckoutSessionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CheckoutSessionRow> = checkout_sessions::table
            .find(reference.as_ref())
            .select(CheckoutSessionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_session).transpose()
    }

    async fn mark_completed(
        &self,
        reference: &PaymentReference,
        order_id: &OrderId,
    ) -> Result<(), CheckoutSessionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(checkout_sessions::table.find(reference.as_ref()))
            .set((
                checkout_sessions::status.eq(CheckoutSessionStatus::Completed.as_str()),
                checkout_sessions::order_id.eq(Some(*order_id.as_uuid())),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
