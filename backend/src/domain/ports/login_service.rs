//! Driving port for signing shoppers in.
//!
//! Inbound adapters call it to turn a raw identifier into a durable user
//! without knowing how users are stored.

use async_trait::async_trait;

use crate::domain::{Error, User, UserIdentifier};

/// Domain use-case port for sign-in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Resolve (or create) the user behind an identifier.
    async fn login(&self, identifier: &UserIdentifier) -> Result<User, Error>;
}
