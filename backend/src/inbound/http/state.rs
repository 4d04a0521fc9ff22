//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CartCommand, CartQuery, CatalogQuery, CheckoutCommand, GroupBuyCommand, GroupBuyQuery,
    LoginService, OrderCommand, OrderQuery, ProfileCommand,
};

/// Dependency bundle for HTTP handlers.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use fluxcart::domain::ports::FixtureIdempotencyRepository;
/// use fluxcart::domain::{
///     CartService, CatalogService, CheckoutService, CheckoutServicePorts, CheckoutSettings,
///     DirectoryLoginService, GroupBuyService, IdempotentMutationRunner, OrderService,
///     ProfileService,
/// };
/// use fluxcart::domain::ports::NoOpReceiptNotifier;
/// use fluxcart::inbound::http::state::HttpState;
/// use fluxcart::outbound::memory::MemoryStore;
/// use mockable::DefaultClock;
///
/// let clock = Arc::new(DefaultClock);
/// let store = Arc::new(MemoryStore::new(clock.clone()));
/// let runner = IdempotentMutationRunner::new(Arc::new(FixtureIdempotencyRepository), clock.clone());
/// let notifier = Arc::new(NoOpReceiptNotifier);
/// let cart = Arc::new(CartService::new(store.clone(), store.clone(), runner.clone()));
/// let orders = Arc::new(OrderService::new(store.clone(), store.clone(), notifier.clone(), runner.clone()));
/// let group_buys = Arc::new(GroupBuyService::new(store.clone(), store.clone(), runner.clone(), clock.clone()));
/// let state = HttpState {
///     login: Arc::new(DirectoryLoginService::new(store.clone())),
///     profile: Arc::new(ProfileService::new(store.clone())),
///     catalog: Arc::new(CatalogService::new(store.clone(), None)),
///     cart: cart.clone(),
///     cart_query: cart,
///     checkout: Arc::new(CheckoutService::new(
///         CheckoutServicePorts {
///             carts: store.clone(),
///             orders: store.clone(),
///             sessions: store.clone(),
///             users: store,
///             gateway: None,
///             notifier,
///         },
///         runner,
///         clock,
///         CheckoutSettings::new("http://localhost:3000"),
///     )),
///     orders: orders.clone(),
///     orders_query: orders,
///     group_buys: group_buys.clone(),
///     group_buys_query: group_buys,
/// };
/// let _login = state.login.clone();
/// ```
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub profile: Arc<dyn ProfileCommand>,
    pub catalog: Arc<dyn CatalogQuery>,
    pub cart: Arc<dyn CartCommand>,
    pub cart_query: Arc<dyn CartQuery>,
    pub checkout: Arc<dyn CheckoutCommand>,
    pub orders: Arc<dyn OrderCommand>,
    pub orders_query: Arc<dyn OrderQuery>,
    pub group_buys: Arc<dyn GroupBuyCommand>,
    pub group_buys_query: Arc<dyn GroupBuyQuery>,
}
