//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`, via
//! the `test-support` feature). Nothing here is compiled into release builds.

pub mod clock {
    //! Controllable clocks.

    use std::sync::Mutex;

    use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
    use mockable::Clock;

    /// Instant used by fixtures unless a test needs another.
    pub fn fixture_now() -> DateTime<Utc> {
        match Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).single() {
            Some(now) => now,
            None => panic!("fixture timestamp is valid"),
        }
    }

    /// Clock that only moves when told to.
    pub struct MutableClock(Mutex<DateTime<Utc>>);

    impl MutableClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        pub fn advance_seconds(&self, seconds: i64) {
            *self.lock_clock() += TimeDelta::seconds(seconds);
        }

        fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
            match self.0.lock() {
                Ok(guard) => guard,
                Err(_) => panic!("clock mutex"),
            }
        }
    }

    impl Default for MutableClock {
        fn default() -> Self {
            Self::new(fixture_now())
        }
    }

    impl Clock for MutableClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.lock_clock()
        }
    }
}

pub mod catalog {
    //! Product builders.

    use chrono::Utc;

    use crate::domain::{DEFAULT_CURRENCY, Product, ProductId, RentalPolicy};

    /// A buy-only product with the given slug and price.
    pub fn product(slug: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId::random(),
            slug: slug.to_owned(),
            title: slug.replace('-', " "),
            description: format!("{slug} description"),
            price_cents,
            currency: DEFAULT_CURRENCY.to_owned(),
            rating: 4.5,
            images: vec![format!("https://img.example/{slug}.jpg")],
            stock: 10,
            category: Some("home".to_owned()),
            rental_policy: None,
            created_at: Utc::now(),
        }
    }

    /// A product that can also be rented.
    pub fn rentable_product(slug: &str, price_cents: i64) -> Product {
        Product {
            rental_policy: Some(RentalPolicy {
                min_days: 1,
                max_days: 30,
                daily_price_cents: price_cents / 20,
                deposit_cents: price_cents / 5,
            }),
            ..product(slug, price_cents)
        }
    }
}

pub mod idempotency {
    //! Idempotency runners for service tests.

    use std::sync::Arc;

    use super::clock::MutableClock;
    use crate::domain::IdempotentMutationRunner;
    use crate::domain::ports::{FixtureIdempotencyRepository, IdempotencyRepository};

    /// Runner over `repository` with a frozen clock.
    pub fn runner_with(repository: Arc<dyn IdempotencyRepository>) -> IdempotentMutationRunner {
        IdempotentMutationRunner::new(repository, Arc::new(MutableClock::default()))
    }

    /// Runner that never replays; keyless mutations run directly.
    pub fn forgetful_runner() -> IdempotentMutationRunner {
        runner_with(Arc::new(FixtureIdempotencyRepository))
    }
}

pub mod cart {
    //! Cart line builders.

    use chrono::Utc;

    use crate::domain::{
        CartItem, CartItemId, CartLine, HoldId, LineKind, Product, RentalWindow, UserId,
    };

    /// A stored line for `product` owned by `user`.
    pub fn line(user: &UserId, product: &Product, qty: u32, kind: LineKind) -> CartLine {
        CartLine {
            item: CartItem {
                id: CartItemId::random(),
                user_id: user.clone(),
                product_id: product.id.clone(),
                qty,
                kind,
                window: RentalWindow::default(),
                hold_id: HoldId::for_cart(),
                created_at: Utc::now(),
            },
            product: product.summary(),
        }
    }
}

pub mod notifications {
    //! Receipt notifier that remembers what it was asked to send.

    use std::sync::Mutex;

    use crate::domain::OrderId;
    use crate::domain::ports::ReceiptNotifier;

    /// Records every order handed to the dispatcher.
    #[derive(Default)]
    pub struct RecordingReceiptNotifier(Mutex<Vec<OrderId>>);

    impl RecordingReceiptNotifier {
        /// Orders notified so far, in call order.
        pub fn notified(&self) -> Vec<OrderId> {
            match self.0.lock() {
                Ok(guard) => guard.clone(),
                Err(_) => panic!("notifier mutex"),
            }
        }
    }

    impl ReceiptNotifier for RecordingReceiptNotifier {
        fn notify(&self, order_id: &OrderId) {
            if let Ok(mut guard) = self.0.lock() {
                guard.push(order_id.clone());
            }
        }
    }
}

pub mod payment {
    //! In-process stand-in for the hosted checkout provider.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::domain::ports::{PaymentGateway, PaymentGatewayError};
    use crate::domain::{
        PaymentEvent, PaymentReference, PaymentSession, PaymentSessionRequest,
        PaymentStatusReport,
    };

    /// Opens unpaid sessions that tests settle with [`FakePaymentGateway::mark_paid`].
    #[derive(Default)]
    pub struct FakePaymentGateway {
        sessions: Mutex<HashMap<PaymentReference, PaymentStatusReport>>,
        opened: AtomicUsize,
    }

    impl FakePaymentGateway {
        /// Flag a session as paid. Returns `false` for unknown references.
        pub fn mark_paid(&self, reference: &PaymentReference) -> bool {
            self.with_sessions(|sessions| {
                sessions
                    .get_mut(reference)
                    .map(|report| report.paid = true)
                    .is_some()
            })
        }

        /// Number of sessions opened so far.
        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        fn with_sessions<T>(
            &self,
            f: impl FnOnce(&mut HashMap<PaymentReference, PaymentStatusReport>) -> T,
        ) -> T {
            match self.sessions.lock() {
                Ok(mut guard) => f(&mut guard),
                Err(_) => panic!("gateway mutex"),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for FakePaymentGateway {
        async fn create_session(
            &self,
            request: &PaymentSessionRequest,
        ) -> Result<PaymentSession, PaymentGatewayError> {
            let sequence = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
            let reference = PaymentReference::new(format!("cs_test_{sequence}"))
                .map_err(|err| PaymentGatewayError::invalid_response(err.to_string()))?;
            let report = PaymentStatusReport {
                reference: reference.clone(),
                paid: false,
                metadata: request.metadata.clone(),
            };
            self.with_sessions(|sessions| sessions.insert(reference.clone(), report));
            Ok(PaymentSession {
                redirect_url: format!("https://pay.example/{reference}"),
                reference,
            })
        }

        async fn retrieve_session(
            &self,
            reference: &PaymentReference,
        ) -> Result<PaymentStatusReport, PaymentGatewayError> {
            self.with_sessions(|sessions| sessions.get(reference).cloned())
                .ok_or_else(|| PaymentGatewayError::rejected("No such checkout session"))
        }

        fn verify_event(
            &self,
            _payload: &[u8],
            _signature: &str,
        ) -> Result<PaymentEvent, PaymentGatewayError> {
            Err(PaymentGatewayError::invalid_signature(
                "the fake gateway does not sign webhooks",
            ))
        }
    }
}

pub mod shop {
    //! A fully wired shop over the in-memory store.

    use std::sync::Arc;

    use super::clock::MutableClock;
    use super::notifications::RecordingReceiptNotifier;
    use crate::domain::ports::PaymentGateway;
    use crate::domain::{
        CartService, CatalogService, CheckoutService, CheckoutServicePorts, CheckoutSettings,
        DirectoryLoginService, GroupBuyService, IdempotentMutationRunner, OrderService, Product,
        ProfileService,
    };
    use crate::inbound::http::state::HttpState;
    use crate::outbound::memory::MemoryStore;

    /// Storefront origin used in redirect and receipt links.
    pub const WEB_URL: &str = "http://shop.test";

    /// Services, store and observers for one test.
    pub struct TestShop {
        pub store: Arc<MemoryStore>,
        pub clock: Arc<MutableClock>,
        pub notifier: Arc<RecordingReceiptNotifier>,
        pub state: HttpState,
    }

    impl TestShop {
        /// Shop selling `products` with the simulated checkout path.
        pub fn new(products: Vec<Product>) -> Self {
            Self::build(products, None)
        }

        /// Shop selling `products` through `gateway`.
        pub fn with_gateway(products: Vec<Product>, gateway: Arc<dyn PaymentGateway>) -> Self {
            Self::build(products, Some(gateway))
        }

        fn build(products: Vec<Product>, gateway: Option<Arc<dyn PaymentGateway>>) -> Self {
            let clock = Arc::new(MutableClock::default());
            let store = Arc::new(MemoryStore::with_products(clock.clone(), products));
            let notifier = Arc::new(RecordingReceiptNotifier::default());
            let runner = IdempotentMutationRunner::new(store.clone(), clock.clone());
            let cart = Arc::new(CartService::new(store.clone(), store.clone(), runner.clone()));
            let orders = Arc::new(OrderService::new(
                store.clone(),
                store.clone(),
                notifier.clone(),
                runner.clone(),
            ));
            let group_buys = Arc::new(GroupBuyService::new(
                store.clone(),
                store.clone(),
                runner.clone(),
                clock.clone(),
            ));
            let checkout = Arc::new(CheckoutService::new(
                CheckoutServicePorts {
                    carts: store.clone(),
                    orders: store.clone(),
                    sessions: store.clone(),
                    users: store.clone(),
                    gateway,
                    notifier: notifier.clone(),
                },
                runner,
                clock.clone(),
                CheckoutSettings::new(WEB_URL),
            ));
            let state = HttpState {
                login: Arc::new(DirectoryLoginService::new(store.clone())),
                profile: Arc::new(ProfileService::new(store.clone())),
                catalog: Arc::new(CatalogService::new(store.clone(), None)),
                cart: cart.clone(),
                cart_query: cart,
                checkout,
                orders: orders.clone(),
                orders_query: orders,
                group_buys: group_buys.clone(),
                group_buys_query: group_buys,
            };
            Self {
                store,
                clock,
                notifier,
                state,
            }
        }
    }
}
