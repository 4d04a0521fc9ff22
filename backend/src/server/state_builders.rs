//! Builders for repository sets and the shared HTTP state.

use std::sync::Arc;

use mockable::Clock;

use fluxcart::domain::ports::{
    CartRepository, CheckoutSessionRepository, GroupBuyRepository, IdempotencyRepository,
    OrderRepository, PaymentGateway, ProductRepository, ProductSearch, ReceiptNotifier,
    UserDirectory,
};
use fluxcart::domain::{
    CartService, CatalogService, CheckoutService, CheckoutServicePorts, CheckoutSettings,
    DirectoryLoginService, GroupBuyService, GroupBuySettlementPorts, IdempotentMutationRunner,
    OrderService, ProfileService,
};
use fluxcart::inbound::http::state::HttpState;
use fluxcart::outbound::memory::MemoryStore;
use fluxcart::outbound::persistence::{
    DbPool, DieselCartRepository, DieselCheckoutSessionRepository, DieselGroupBuyRepository,
    DieselIdempotencyRepository, DieselOrderRepository, DieselProductRepository,
    DieselUserDirectory,
};

/// Every driven persistence port, backed by one store.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub sessions: Arc<dyn CheckoutSessionRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub group_buys: Arc<dyn GroupBuyRepository>,
    pub idempotency: Arc<dyn IdempotencyRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing `pool`.
    pub fn from_pool(pool: &DbPool) -> Self {
        Self {
            products: Arc::new(DieselProductRepository::new(pool.clone())),
            carts: Arc::new(DieselCartRepository::new(pool.clone())),
            orders: Arc::new(DieselOrderRepository::new(pool.clone())),
            sessions: Arc::new(DieselCheckoutSessionRepository::new(pool.clone())),
            users: Arc::new(DieselUserDirectory::new(pool.clone())),
            group_buys: Arc::new(DieselGroupBuyRepository::new(pool.clone())),
            idempotency: Arc::new(DieselIdempotencyRepository::new(pool.clone())),
        }
    }

    /// Process-local repositories; state is lost on restart.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::from_store(&Arc::new(MemoryStore::new(clock)))
    }

    fn from_store(store: &Arc<MemoryStore>) -> Self {
        Self {
            products: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            sessions: store.clone(),
            users: store.clone(),
            group_buys: store.clone(),
            idempotency: store.clone(),
        }
    }

    /// Select the database when a pool is available, otherwise memory.
    pub fn select(pool: Option<&DbPool>, clock: Arc<dyn Clock>) -> Self {
        match pool {
            Some(pool) => Self::from_pool(pool),
            None => Self::in_memory(clock),
        }
    }

    /// Ports consumed by the settlement worker.
    pub fn settlement_ports(&self) -> GroupBuySettlementPorts {
        GroupBuySettlementPorts::new(self.group_buys.clone(), self.carts.clone())
    }
}

/// Optional third-party collaborators.
pub struct Collaborators {
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub search: Option<Arc<dyn ProductSearch>>,
    pub notifier: Arc<dyn ReceiptNotifier>,
}

/// Wire every driving port over `repositories`.
pub fn build_http_state(
    repositories: &Repositories,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    web_url: &str,
) -> HttpState {
    let Collaborators {
        gateway,
        search,
        notifier,
    } = collaborators;
    let runner = IdempotentMutationRunner::new(repositories.idempotency.clone(), clock.clone());

    let cart = Arc::new(CartService::new(
        repositories.carts.clone(),
        repositories.products.clone(),
        runner.clone(),
    ));
    let orders = Arc::new(OrderService::new(
        repositories.orders.clone(),
        repositories.carts.clone(),
        notifier.clone(),
        runner.clone(),
    ));
    let group_buys = Arc::new(GroupBuyService::new(
        repositories.group_buys.clone(),
        repositories.products.clone(),
        runner.clone(),
        clock.clone(),
    ));
    let checkout = Arc::new(CheckoutService::new(
        CheckoutServicePorts {
            carts: repositories.carts.clone(),
            orders: repositories.orders.clone(),
            sessions: repositories.sessions.clone(),
            users: repositories.users.clone(),
            gateway,
            notifier,
        },
        runner,
        clock,
        CheckoutSettings::new(web_url),
    ));

    HttpState {
        login: Arc::new(DirectoryLoginService::new(repositories.users.clone())),
        profile: Arc::new(ProfileService::new(repositories.users.clone())),
        catalog: Arc::new(CatalogService::new(repositories.products.clone(), search)),
        cart: cart.clone(),
        cart_query: cart,
        checkout,
        orders: orders.clone(),
        orders_query: orders,
        group_buys: group_buys.clone(),
        group_buys_query: group_buys,
    }
}
