//! FluxCart storefront backend.
//!
//! - [`domain`]: shop model, pricing, services and ports
//! - [`inbound`]: HTTP adapter
//! - [`outbound`]: persistence, payment, search, mail and notification adapters
//! - [`settings`]: OrthoConfig-backed configuration

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
