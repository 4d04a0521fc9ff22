//! Profile reads and edits backed by the user directory.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::port_error_mapping::map_user_error;
use super::ports::{ProfileCommand, UserDirectory};
use super::{AuthContext, Error, Profile, ProfileUpdate, ProfileValidationError};

/// Serves `/me` over a [`UserDirectory`].
#[derive(Clone)]
pub struct ProfileService {
    directory: Arc<dyn UserDirectory>,
}

fn validation_error(error: &ProfileValidationError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": error.field(),
        "code": "invalid_value",
    }))
}

fn missing_user() -> Error {
    Error::not_found("user not found")
}

impl ProfileService {
    /// Create the service over a user directory.
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ProfileCommand for ProfileService {
    async fn profile(&self, auth: &AuthContext) -> Result<Profile, Error> {
        self.directory
            .profile(auth.user_id())
            .await
            .map_err(map_user_error)?
            .ok_or_else(missing_user)
    }

    async fn update_profile(
        &self,
        auth: &AuthContext,
        update: ProfileUpdate,
    ) -> Result<Profile, Error> {
        let update = update
            .normalised()
            .map_err(|error| validation_error(&error))?;
        if update.is_empty() {
            return self.profile(auth).await;
        }
        let profile = self
            .directory
            .update_profile(auth.user_id(), &update)
            .await
            .map_err(map_user_error)?
            .ok_or_else(missing_user)?;
        info!(user_id = %auth.user_id(), "profile updated");
        Ok(profile)
    }
}
