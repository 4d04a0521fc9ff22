//! Driving port for reading and editing the caller's profile.

use async_trait::async_trait;

use crate::domain::{AuthContext, Error, Profile, ProfileUpdate};

/// Profile use-cases exposed on `/me`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileCommand: Send + Sync {
    /// The caller's profile.
    async fn profile(&self, auth: &AuthContext) -> Result<Profile, Error>;

    /// Validate and apply an edit, returning the updated profile.
    async fn update_profile(
        &self,
        auth: &AuthContext,
        update: ProfileUpdate,
    ) -> Result<Profile, Error>;
}
