//! Users and profiles held in memory.

use async_trait::async_trait;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{Profile, ProfileDetails, ProfileUpdate, User, UserId, UserIdentifier};

use super::MemoryStore;

fn matches_identifier(user: &User, identifier: &UserIdentifier) -> bool {
    let profile = identifier.new_profile();
    match identifier {
        UserIdentifier::Phone(_) => profile.phone.is_some() && user.phone() == profile.phone.as_deref(),
        UserIdentifier::Email(_) | UserIdentifier::Alias(_) => {
            profile.email.is_some() && user.email() == profile.email.as_deref()
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn resolve(&self, identifier: &UserIdentifier) -> Result<User, UserDirectoryError> {
        let now = self.now();
        self.with_state(UserDirectoryError::connection, |state| {
            if let Some(existing) = state
                .users
                .iter()
                .find(|stored| matches_identifier(&stored.user, identifier))
            {
                return Ok(existing.user.clone());
            }
            let profile = identifier.new_profile();
            let user = User::new(
                UserId::random(),
                profile.display_name,
                profile.email,
                profile.phone,
            );
            state.users.push(Profile {
                user: user.clone(),
                details: ProfileDetails::default(),
                created_at: now,
            });
            Ok(user)
        })
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError> {
        Ok(self.profile(id).await?.map(|profile| profile.user))
    }

    async fn find_by_contact(&self, contact: &str) -> Result<Option<User>, UserDirectoryError> {
        self.with_state(UserDirectoryError::connection, |state| {
            Ok(state
                .users
                .iter()
                .map(|stored| &stored.user)
                .find(|user| user.email() == Some(contact) || user.phone() == Some(contact))
                .cloned())
        })
    }

    async fn profile(&self, id: &UserId) -> Result<Option<Profile>, UserDirectoryError> {
        self.with_state(UserDirectoryError::connection, |state| {
            Ok(state.users.iter().find(|stored| stored.user.id() == id).cloned())
        })
    }

    async fn update_profile(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, UserDirectoryError> {
        self.with_state(UserDirectoryError::connection, |state| {
            if let Some(phone) = update.phone.as_deref() {
                let taken = state
                    .users
                    .iter()
                    .any(|stored| stored.user.id() != id && stored.user.phone() == Some(phone));
                if taken {
                    return Err(UserDirectoryError::phone_taken(phone));
                }
            }
            let Some(stored) = state.users.iter_mut().find(|stored| stored.user.id() == id) else {
                return Ok(None);
            };
            update.apply(stored);
            Ok(Some(stored.clone()))
        })
    }
}
