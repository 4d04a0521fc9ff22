//! Domain primitives, aggregates and services.
//!
//! Purpose: define the strongly typed shop model (catalog, cart, orders,
//! checkout, group-buys) and the services that drive it through ports.
//! Adapters live in `inbound` and `outbound`; nothing here knows about HTTP
//! or SQL.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - AuthContext: caller identity handed to every driving port.
//! - Totals / `compute_totals`: the pricing and discount rule.
//! - CartService, CheckoutService, OrderService, GroupBuyService,
//!   CatalogService, DirectoryLoginService, ProfileService: driving port
//!   implementations.
//! - GroupBuySettlementWorker: recurring settlement of expired group-buys.

pub mod auth;
pub mod cart;
pub mod cart_service;
pub mod catalog;
pub mod catalog_service;
pub mod checkout;
pub mod checkout_service;
pub mod error;
pub mod group_buy;
pub mod group_buy_service;
pub mod group_buy_settlement;
pub mod idempotency;
pub mod idempotent_mutation;
pub mod ids;
pub mod login_service;
pub mod order;
pub mod order_service;
pub(crate) mod port_error_mapping;
pub mod ports;
pub mod pricing;
pub mod profile;
pub mod profile_service;
pub mod receipt;
pub mod trace_id;
pub mod user;

pub use self::auth::AuthContext;
pub use self::cart::{
    CartItem, CartLine, CartValidationError, HoldId, LineKind, NewCartItem, ParseLineKindError,
    RentalWindow,
};
pub use self::cart_service::CartService;
pub use self::catalog::{
    DEFAULT_CURRENCY, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Product, ProductPage, ProductQuery,
    ProductSummary, RentalPolicy,
};
pub use self::catalog_service::CatalogService;
pub use self::checkout::{
    CheckoutError, CheckoutSession, CheckoutSessionStatus, CheckoutSnapshot, CheckoutStart,
    ConfirmationOutcome, PaymentEvent, PaymentEventKind, PaymentLine, PaymentMetadata,
    PaymentSession, PaymentSessionRequest, PaymentStatusReport, SnapshotLine,
};
pub use self::checkout_service::{CheckoutService, CheckoutServicePorts, CheckoutSettings};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::group_buy::{
    GroupBuy, GroupBuyDetail, GroupBuyDraft, GroupBuyParticipant, GroupBuyStatus,
    GroupBuyValidationError, JoinOutcome, ParseGroupBuyStatusError, SettlementDecision,
};
pub use self::group_buy_service::GroupBuyService;
pub use self::group_buy_settlement::{
    GroupBuySettlementConfig, GroupBuySettlementPorts, GroupBuySettlementRuntime,
    GroupBuySettlementWorker, SettlementReport, SettlementSleeper, TokioSleeper,
};
pub use self::idempotency::{
    IdempotencyConfig, IdempotencyKey, IdempotencyKeyValidationError, IdempotencyLookupQuery,
    IdempotencyLookupResult, IdempotencyRecord, MutationType, ParseMutationTypeError,
    PayloadHash, PayloadHashError, canonicalize_and_hash,
};
pub use self::idempotent_mutation::{IdempotentMutationContext, IdempotentMutationRunner};
pub use self::ids::{CartItemId, GroupBuyId, IdValidationError, OrderId, ProductId, UserId};
pub use self::login_service::DirectoryLoginService;
pub use self::order::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, OrderValidationError,
    ParseOrderStatusError, PaymentReference, PaymentReferenceError,
};
pub use self::order_service::OrderService;
pub use self::pricing::{LineAmount, PricingError, Totals, compute_totals, discount_for};
pub use self::profile::{Profile, ProfileDetails, ProfileUpdate, ProfileValidationError};
pub use self::profile_service::ProfileService;
pub use self::receipt::{ReceiptContent, ReceiptMessage, compose_receipt};
pub use self::trace_id::TraceId;
pub use self::user::{NewUserProfile, User, UserIdentifier, UserIdentifierError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use fluxcart::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::not_found("order not found"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
