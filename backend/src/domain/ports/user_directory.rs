//! Port for resolving sign-in identifiers to durable users.

use async_trait::async_trait;

use crate::domain::{Profile, ProfileUpdate, User, UserId, UserIdentifier};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } => "user directory connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user directory query failed: {message}",
        /// Another account already uses the phone number.
        PhoneTaken { phone: String } => "phone {phone} belongs to another account",
    }
}

/// User lookup and creation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the user for an identifier, creating one on first sight.
    ///
    /// Emails and development aliases upsert by email; phone numbers upsert
    /// by phone.
    async fn resolve(&self, identifier: &UserIdentifier) -> Result<User, UserDirectoryError>;

    /// User by id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError>;

    /// User whose email or phone equals `contact` exactly.
    async fn find_by_contact(&self, contact: &str) -> Result<Option<User>, UserDirectoryError>;

    /// Full profile of a user.
    async fn profile(&self, id: &UserId) -> Result<Option<Profile>, UserDirectoryError>;

    /// Apply a normalised edit and return the stored result; `None` when the
    /// user does not exist.
    ///
    /// Fails with [`UserDirectoryError::PhoneTaken`] when the new phone
    /// number is held by a different user.
    async fn update_profile(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, UserDirectoryError>;
}
