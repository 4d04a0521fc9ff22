//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: a process-local store used when no database is configured
//! - **payment**: Stripe-compatible hosted checkout and webhook verification
//! - **search**: optional Meilisearch ranking for the catalog
//! - **mail**: HTTP mail relay for receipts
//! - **notifications**: bounded background receipt dispatch
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod mail;
pub mod memory;
pub mod notifications;
pub mod payment;
pub mod persistence;
pub mod search;
