//! Group-buy creation, joins and reads.
//!
//! Settlement lives in [`crate::domain::group_buy_settlement`]; this service
//! only opens commitments and records participants.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::idempotent_mutation::{IdempotentMutationContext, IdempotentMutationRunner};
use super::port_error_mapping::{map_group_buy_error, map_product_error};
use super::ports::{
    CreateGroupBuyRequest, GroupBuyCommand, GroupBuyQuery, GroupBuyRepository, JoinReceipt,
    ProductRepository,
};
use super::{
    AuthContext, Error, GroupBuy, GroupBuyDetail, GroupBuyDraft, GroupBuyId,
    GroupBuyValidationError, JoinOutcome, MutationType, ProductId,
};

/// Group-buy service implementing the group-buy driving ports.
#[derive(Clone)]
pub struct GroupBuyService {
    group_buys: Arc<dyn GroupBuyRepository>,
    products: Arc<dyn ProductRepository>,
    idempotency: IdempotentMutationRunner,
    clock: Arc<dyn Clock>,
}

fn closed_error() -> Error {
    Error::invalid_request("group-buy is closed").with_details(json!({
        "code": "group_buy_closed",
    }))
}

fn validation_error(error: &GroupBuyValidationError) -> Error {
    let field = match error {
        GroupBuyValidationError::NonPositiveMinimum => "minParticipants",
        GroupBuyValidationError::DeadlineNotInFuture => "deadline",
    };
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": field,
        "code": "invalid_value",
    }))
}

impl GroupBuyService {
    /// Create the service.
    pub fn new(
        group_buys: Arc<dyn GroupBuyRepository>,
        products: Arc<dyn ProductRepository>,
        idempotency: IdempotentMutationRunner,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            group_buys,
            products,
            idempotency,
            clock,
        }
    }

    async fn open(&self, draft: GroupBuyDraft) -> Result<GroupBuy, Error> {
        self.products
            .find_by_id(&draft.product_id)
            .await
            .map_err(map_product_error)?
            .ok_or_else(|| Error::not_found("product not found"))?;
        let group_buy = self
            .group_buys
            .create(&draft, self.clock.utc())
            .await
            .map_err(map_group_buy_error)?;
        info!(
            group_buy_id = %group_buy.id,
            product_id = %group_buy.product_id,
            min_participants = group_buy.min_participants,
            deadline = %group_buy.deadline,
            "group-buy opened"
        );
        Ok(group_buy)
    }
}

#[async_trait]
impl GroupBuyCommand for GroupBuyService {
    async fn create(&self, request: CreateGroupBuyRequest) -> Result<GroupBuy, Error> {
        let draft = GroupBuyDraft::new(
            request.auth.user_id().clone(),
            request.product_id.clone(),
            request.min_participants,
            request.deadline,
            self.clock.utc(),
        )
        .map_err(|err| validation_error(&err))?;
        let context = IdempotentMutationContext::new(
            MutationType::GroupBuys,
            request.idempotency_key,
            request.auth.user_id().clone(),
            &json!({
                "productId": request.product_id,
                "minParticipants": request.min_participants,
                "deadline": request.deadline,
            }),
        )?;
        self.idempotency.run(context, || self.open(draft)).await
    }

    async fn join(&self, auth: &AuthContext, id: &GroupBuyId) -> Result<JoinReceipt, Error> {
        let outcome = self
            .group_buys
            .join(id, auth.user_id(), self.clock.utc())
            .await
            .map_err(map_group_buy_error)?;
        match outcome {
            JoinOutcome::Joined => {
                info!(group_buy_id = %id, user_id = %auth.user_id(), "group-buy joined");
                Ok(JoinReceipt {
                    ok: true,
                    already_joined: false,
                })
            }
            JoinOutcome::AlreadyJoined => Ok(JoinReceipt {
                ok: true,
                already_joined: true,
            }),
            JoinOutcome::Closed => Err(closed_error()),
            JoinOutcome::NotFound => Err(Error::not_found(format!("group-buy {id} not found"))),
        }
    }
}

#[async_trait]
impl GroupBuyQuery for GroupBuyService {
    async fn list_open(&self, product_id: &ProductId) -> Result<Vec<GroupBuy>, Error> {
        self.group_buys
            .list_open(product_id, self.clock.utc())
            .await
            .map_err(map_group_buy_error)
    }

    async fn get(&self, id: &GroupBuyId) -> Result<GroupBuyDetail, Error> {
        self.group_buys
            .find(id)
            .await
            .map_err(map_group_buy_error)?
            .ok_or_else(|| Error::not_found(format!("group-buy {id} not found")))
    }
}

#[cfg(test)]
#[path = "group_buy_service_tests.rs"]
mod tests;
