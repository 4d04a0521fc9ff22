//! Recurring settlement of expired group-buys.
//!
//! Each pass lists OPEN group-buys whose deadline has passed and claims them
//! one by one with a conditional OPEN→SETTLING transition, so several
//! instances can run the worker at once and every group-buy is settled by
//! exactly one of them. Group-buys left in SETTLING by a crashed pass become
//! claimable again once their lease expires.
//!
//! A successful group-buy places one BUY hold per participant. Hold tokens
//! are derived from the group-buy and user ids, so re-running a settlement
//! never duplicates them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::port_error_mapping::{map_cart_error, map_group_buy_error};
use crate::domain::ports::{CartRepository, GroupBuyRepository};
use crate::domain::{
    Error, GroupBuyId, GroupBuyParticipant, HoldId, LineKind, NewCartItem, ProductId,
    RentalWindow, SettlementDecision, TraceId,
};

mod runtime;

pub use runtime::{GroupBuySettlementPorts, GroupBuySettlementRuntime, TokioSleeper};

/// Worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBuySettlementConfig {
    /// Pause between passes.
    pub interval: Duration,
    /// Group-buys considered per pass.
    pub batch_size: u32,
    /// How long a SETTLING claim is honoured before it may be reclaimed.
    pub lease: Duration,
}

impl Default for GroupBuySettlementConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            batch_size: 50,
            lease: Duration::from_secs(300),
        }
    }
}

/// Async sleeping abstraction between passes.
#[async_trait]
pub trait SettlementSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Summary of one settlement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementReport {
    /// Group-buys that reached SUCCESS.
    pub succeeded: u32,
    /// Group-buys that reached FAILED.
    pub failed: u32,
    /// Candidates another worker claimed first.
    pub skipped: u32,
    /// Candidates whose settlement raised an error.
    pub errored: u32,
}

impl SettlementReport {
    fn record(&mut self, decision: SettlementDecision) {
        match decision {
            SettlementDecision::Success => self.succeeded += 1,
            SettlementDecision::Failed => self.failed += 1,
        }
    }

    /// Group-buys this pass moved to a terminal status.
    #[must_use]
    pub const fn settled(&self) -> u32 {
        self.succeeded + self.failed
    }
}

/// Domain-owned group-buy settlement worker.
pub struct GroupBuySettlementWorker {
    group_buys: Arc<dyn GroupBuyRepository>,
    carts: Arc<dyn CartRepository>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn SettlementSleeper>,
    config: GroupBuySettlementConfig,
}

impl GroupBuySettlementWorker {
    /// Build a worker using default runtime dependencies.
    pub fn new(
        ports: GroupBuySettlementPorts,
        clock: Arc<dyn Clock>,
        config: GroupBuySettlementConfig,
    ) -> Self {
        Self::with_runtime(ports, clock, GroupBuySettlementRuntime::default(), config)
    }

    /// Build a worker with injected runtime abstractions.
    pub fn with_runtime(
        ports: GroupBuySettlementPorts,
        clock: Arc<dyn Clock>,
        runtime: GroupBuySettlementRuntime,
        config: GroupBuySettlementConfig,
    ) -> Self {
        Self {
            group_buys: ports.group_buys,
            carts: ports.carts,
            clock,
            sleeper: runtime.sleeper,
            config,
        }
    }

    fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let lease = TimeDelta::from_std(self.config.lease).unwrap_or(TimeDelta::MAX);
        now.checked_sub_signed(lease).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Settle every due group-buy in one batch.
    ///
    /// # Errors
    /// Returns an error only when the candidate listing fails; failures of
    /// individual group-buys are logged and counted in the report.
    pub async fn settle_once(&self) -> Result<SettlementReport, Error> {
        let now = self.clock.utc();
        let stale_before = self.stale_before(now);
        let candidates = self
            .group_buys
            .list_settleable(now, stale_before, self.config.batch_size)
            .await
            .map_err(map_group_buy_error)?;

        let mut report = SettlementReport::default();
        for id in candidates {
            match self.settle(&id, now, stale_before).await {
                Ok(Some(decision)) => report.record(decision),
                Ok(None) => report.skipped += 1,
                Err(error) => {
                    warn!(group_buy_id = %id, %error, "group-buy settlement failed");
                    report.errored += 1;
                }
            }
        }
        Ok(report)
    }

    async fn settle(
        &self,
        id: &GroupBuyId,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<SettlementDecision>, Error> {
        let Some(group_buy) = self
            .group_buys
            .try_claim(id, now, stale_before)
            .await
            .map_err(map_group_buy_error)?
        else {
            debug!(group_buy_id = %id, "group-buy claimed by another worker");
            return Ok(None);
        };

        let participants = self
            .group_buys
            .participants(id)
            .await
            .map_err(map_group_buy_error)?;
        let count = u32::try_from(participants.len()).unwrap_or(u32::MAX);
        let decision = SettlementDecision::evaluate(count, group_buy.min_participants);

        let holds = match decision {
            SettlementDecision::Success => {
                self.place_holds(id, &group_buy.product_id, &participants)
                    .await?
            }
            // Nothing was reserved while the group-buy was open.
            SettlementDecision::Failed => 0,
        };

        let finished = self
            .group_buys
            .finish(id, decision.status(), self.clock.utc())
            .await
            .map_err(map_group_buy_error)?;
        if !finished {
            warn!(group_buy_id = %id, "settlement lease lapsed before completion");
        }
        info!(
            group_buy_id = %id,
            product_id = %group_buy.product_id,
            participants = count,
            min_participants = group_buy.min_participants,
            outcome = decision.status().as_str(),
            holds,
            "group-buy settled"
        );
        Ok(Some(decision))
    }

    async fn place_holds(
        &self,
        id: &GroupBuyId,
        product_id: &ProductId,
        participants: &[GroupBuyParticipant],
    ) -> Result<u64, Error> {
        let holds: Vec<NewCartItem> = participants
            .iter()
            .filter_map(|participant| {
                NewCartItem::new(
                    participant.user_id.clone(),
                    product_id.clone(),
                    1,
                    LineKind::Buy,
                    RentalWindow::default(),
                    HoldId::for_group_buy(id, &participant.user_id),
                )
                .ok()
            })
            .collect();
        if holds.is_empty() {
            return Ok(0);
        }
        self.carts
            .insert_many(&holds)
            .await
            .map_err(map_cart_error)
    }

    /// Run passes every `interval` until `shutdown` flips to `true` or its
    /// sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "group-buy settlement worker started"
        );
        while !*shutdown.borrow() {
            let pass = TraceId::generate();
            match TraceId::scope(pass, self.settle_once()).await {
                Ok(report) if report.settled() > 0 || report.errored > 0 => {
                    info!(
                        trace_id = %pass,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        skipped = report.skipped,
                        errored = report.errored,
                        "settlement pass finished"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(trace_id = %pass, %error, "settlement pass could not list candidates");
                }
            }
            tokio::select! {
                () = self.sleeper.sleep(self.config.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("group-buy settlement worker stopped");
    }
}
