//! Authenticated request context.
//!
//! Inbound adapters build an [`AuthContext`] once per request from the
//! session and hand it to every driving port. Business logic never looks at
//! headers or cookies to work out who the caller is.

use super::UserId;

/// Identity of the caller on whose behalf an operation runs.
///
/// # Examples
/// ```
/// use fluxcart::domain::{AuthContext, UserId};
///
/// let user = UserId::random();
/// let auth = AuthContext::new(user.clone());
/// assert_eq!(auth.user_id(), &user);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
}

impl AuthContext {
    /// Wrap an authenticated user identifier.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    /// The authenticated user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }
}
