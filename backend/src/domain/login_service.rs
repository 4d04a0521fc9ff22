//! Sign-in service backed by the user directory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::port_error_mapping::map_user_error;
use super::ports::{LoginService, UserDirectory};
use super::{Error, User, UserIdentifier};

/// Resolves identifiers to users, creating them on first sign-in.
#[derive(Clone)]
pub struct DirectoryLoginService {
    directory: Arc<dyn UserDirectory>,
}

impl DirectoryLoginService {
    /// Create the service over a user directory.
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl LoginService for DirectoryLoginService {
    async fn login(&self, identifier: &UserIdentifier) -> Result<User, Error> {
        let user = self
            .directory
            .resolve(identifier)
            .await
            .map_err(map_user_error)?;
        info!(user_id = %user.id(), "shopper signed in");
        Ok(user)
    }
}
