//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports backed by
//! PostgreSQL via `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. Business rules stay in the domain services.
//! - **Internal models**: row structs (`models.rs`) and the schema
//!   (`schema.rs`) never leave this module.
//! - **Redacted errors**: database failures are logged at `debug` and mapped
//!   to generic port error messages.
//! - **Embedded migrations**: [`run_migrations`] applies `migrations/` at
//!   start-up.
//!
//! # Example
//!
//! ```ignore
//! use fluxcart::outbound::persistence::{DbPool, DieselCartRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/fluxcart")).await?;
//! let carts = DieselCartRepository::new(pool);
//! ```

mod diesel_cart_repository;
mod diesel_checkout_session_repository;
mod diesel_error_mapping;
mod diesel_group_buy_repository;
mod diesel_idempotency_repository;
mod diesel_order_repository;
mod diesel_product_repository;
mod diesel_user_directory;
mod models;
mod pool;
mod schema;

pub use diesel_cart_repository::DieselCartRepository;
pub use diesel_checkout_session_repository::DieselCheckoutSessionRepository;
pub use diesel_group_buy_repository::DieselGroupBuyRepository;
pub use diesel_idempotency_repository::DieselIdempotencyRepository;
pub use diesel_order_repository::DieselOrderRepository;
pub use diesel_product_repository::DieselProductRepository;
pub use diesel_user_directory::DieselUserDirectory;
pub use pool::{DbPool, PoolConfig, PoolError, run_migrations};
