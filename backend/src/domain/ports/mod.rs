//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`, [`LoginService`]) are what inbound
//! adapters call. Driven ports (repositories, gateways, mailers) are what the
//! domain services call and outbound adapters implement.

mod macros;
pub(crate) use macros::define_port_error;

mod cart_command;
mod cart_repository;
mod catalog_query;
mod checkout_command;
mod checkout_session_repository;
mod group_buy_command;
mod group_buy_repository;
mod idempotency_repository;
mod login_service;
mod order_command;
mod order_repository;
mod payment_gateway;
mod product_repository;
mod product_search;
mod profile_command;
mod receipt_mailer;
mod receipt_notifier;
mod user_directory;

#[cfg(test)]
pub use cart_command::{MockCartCommand, MockCartQuery};
pub use cart_command::{AddCartItemRequest, CartCommand, CartQuery, QuantityUpdate};
#[cfg(test)]
pub use cart_repository::MockCartRepository;
pub use cart_repository::{CartRepository, CartRepositoryError};
#[cfg(test)]
pub use catalog_query::MockCatalogQuery;
pub use catalog_query::CatalogQuery;
#[cfg(test)]
pub use checkout_command::MockCheckoutCommand;
pub use checkout_command::{CheckoutCommand, StartCheckoutRequest};
#[cfg(test)]
pub use checkout_session_repository::MockCheckoutSessionRepository;
pub use checkout_session_repository::{
    CheckoutSessionRepository, CheckoutSessionRepositoryError,
};
#[cfg(test)]
pub use group_buy_command::{MockGroupBuyCommand, MockGroupBuyQuery};
pub use group_buy_command::{
    CreateGroupBuyRequest, GroupBuyCommand, GroupBuyQuery, JoinReceipt,
};
#[cfg(test)]
pub use group_buy_repository::MockGroupBuyRepository;
pub use group_buy_repository::{GroupBuyRepository, GroupBuyRepositoryError};
#[cfg(test)]
pub use idempotency_repository::MockIdempotencyRepository;
pub use idempotency_repository::{
    FixtureIdempotencyRepository, IdempotencyRepository, IdempotencyRepositoryError,
};
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::LoginService;
#[cfg(test)]
pub use order_command::{MockOrderCommand, MockOrderQuery};
pub use order_command::{OrderCommand, OrderQuery, ReorderOutcome, ReorderRequest};
#[cfg(test)]
pub use order_repository::MockOrderRepository;
pub use order_repository::{OrderRepository, OrderRepositoryError};
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{PaymentGateway, PaymentGatewayError};
#[cfg(test)]
pub use product_repository::MockProductRepository;
pub use product_repository::{ProductRepository, ProductRepositoryError};
#[cfg(test)]
pub use product_search::MockProductSearch;
pub use product_search::{ProductSearch, ProductSearchError, SearchHits};
#[cfg(test)]
pub use profile_command::MockProfileCommand;
pub use profile_command::ProfileCommand;
#[cfg(test)]
pub use receipt_mailer::MockReceiptMailer;
pub use receipt_mailer::{DisabledReceiptMailer, ReceiptMailer, ReceiptMailerError};
#[cfg(test)]
pub use receipt_notifier::MockReceiptNotifier;
pub use receipt_notifier::{NoOpReceiptNotifier, ReceiptNotifier};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{UserDirectory, UserDirectoryError};
