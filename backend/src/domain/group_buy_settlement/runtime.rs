//! Port and runtime dependency bundles for the settlement worker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{CartRepository, GroupBuyRepository};

use super::SettlementSleeper;

/// Port bundle required by the settlement worker.
pub struct GroupBuySettlementPorts {
    /// Group-buy persistence with the conditional state transitions.
    pub group_buys: Arc<dyn GroupBuyRepository>,
    /// Cart persistence receiving participant holds.
    pub carts: Arc<dyn CartRepository>,
}

impl GroupBuySettlementPorts {
    /// Bundle the worker ports.
    pub fn new(group_buys: Arc<dyn GroupBuyRepository>, carts: Arc<dyn CartRepository>) -> Self {
        Self { group_buys, carts }
    }
}

/// Runtime helpers used between settlement passes.
pub struct GroupBuySettlementRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn SettlementSleeper>,
}

impl Default for GroupBuySettlementRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl SettlementSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
