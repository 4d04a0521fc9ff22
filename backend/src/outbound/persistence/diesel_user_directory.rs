//! PostgreSQL-backed `UserDirectory` implementation using Diesel ORM.
//!
//! Identifier resolution is an upsert on the unique email or phone column, so
//! two concurrent first sign-ins with the same identifier land on one row.
//! The same unique phone column turns a profile edit that claims another
//! account's number into [`UserDirectoryError::PhoneTaken`].

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{
    Profile, ProfileDetails, ProfileUpdate, User, UserId, UserIdentifier,
};

use super::diesel_error_mapping::{DieselFailure, map_basic_diesel_error, pool_error_message};
use super::models::{NewUserRow, ProfileChangeset, ProfileRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed user directory.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserDirectoryError {
    UserDirectoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> UserDirectoryError {
    map_basic_diesel_error(
        error,
        UserDirectoryError::query,
        UserDirectoryError::connection,
    )
}

fn to_user(row: UserRow) -> User {
    User::new(
        UserId::from_uuid(row.id),
        row.display_name,
        row.email,
        row.phone,
    )
}

fn map_update_error(error: diesel::result::Error, phone: Option<&str>) -> UserDirectoryError {
    match (DieselFailure::from(error), phone) {
        (DieselFailure::UniqueViolation { .. }, Some(phone)) => {
            UserDirectoryError::phone_taken(phone)
        }
        (DieselFailure::UniqueViolation { .. }, None) => {
            UserDirectoryError::query("unique constraint violated")
        }
        (DieselFailure::ForeignKeyViolation { .. }, _) => {
            UserDirectoryError::query("foreign key constraint violated")
        }
        (DieselFailure::Connection, _) => {
            UserDirectoryError::connection("database connection error")
        }
        (DieselFailure::Query { message }, _) => UserDirectoryError::query(message),
    }
}

fn to_profile(row: ProfileRow) -> Profile {
    Profile {
        user: User::new(
            UserId::from_uuid(row.id),
            row.display_name,
            row.email,
            row.phone,
        ),
        details: ProfileDetails {
            avatar_url: row.avatar_url,
            bio: row.bio,
            address_line1: row.address_line1,
            address_line2: row.address_line2,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            default_currency: row.default_currency,
            preferences: row.preferences,
        },
        created_at: row.created_at,
    }
}

fn to_changeset(update: &ProfileUpdate) -> ProfileChangeset<'_> {
    ProfileChangeset {
        display_name: update.display_name.as_deref(),
        phone: update.phone.as_deref(),
        avatar_url: update.avatar_url.as_deref(),
        bio: update.bio.as_deref(),
        address_line1: update.address_line1.as_deref(),
        address_line2: update.address_line2.as_deref(),
        city: update.city.as_deref(),
        state: update.state.as_deref(),
        postal_code: update.postal_code.as_deref(),
        country: update.country.as_deref(),
        default_currency: update.default_currency.as_deref(),
        preferences: update.preferences.as_ref(),
    }
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn resolve(&self, identifier: &UserIdentifier) -> Result<User, UserDirectoryError> {
        let profile = identifier.new_profile();
        let new_row = NewUserRow {
            id: Uuid::new_v4(),
            email: profile.email.as_deref(),
            phone: profile.phone.as_deref(),
            display_name: profile.display_name.as_str(),
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // The no-op update makes RETURNING yield the existing row on conflict.
        let insert = diesel::insert_into(users::table).values(&new_row);
        let row: UserRow = match identifier {
            UserIdentifier::Phone(_) => {
                insert
                    .on_conflict(users::phone)
                    .do_update()
                    .set(users::phone.eq(excluded(users::phone)))
                    .returning(UserRow::as_returning())
                    .get_result(&mut conn)
                    .await
            }
            UserIdentifier::Email(_) | UserIdentifier::Alias(_) => {
                insert
                    .on_conflict(users::email)
                    .do_update()
                    .set(users::email.eq(excluded(users::email)))
                    .returning(UserRow::as_returning())
                    .get_result(&mut conn)
                    .await
            }
        }
        .map_err(map_diesel_error)?;

        Ok(to_user(row))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(to_user))
            .map_err(map_diesel_error)
    }

    async fn find_by_contact(&self, contact: &str) -> Result<Option<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(users::email.eq(contact).or(users::phone.eq(contact)))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(to_user))
            .map_err(map_diesel_error)
    }

    async fn profile(&self, id: &UserId) -> Result<Option<Profile>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .find(id.as_uuid())
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(to_profile))
            .map_err(map_diesel_error)
    }

    async fn update_profile(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, UserDirectoryError> {
        if update.is_empty() {
            return self.profile(id).await;
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(users::table.find(id.as_uuid()))
            .set(to_changeset(update))
            .returning(ProfileRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map(|row| row.map(to_profile))
            .map_err(|error| map_update_error(error, update.phone.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for profile row mapping.
    use super::*;
    use crate::test_support::clock::fixture_now;
    use diesel::result::DatabaseErrorKind;
    use rstest::rstest;
    use serde_json::json;

    fn unique_violation() -> diesel::result::Error {
        diesel::result::Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_owned()),
        )
    }

    #[rstest]
    fn duplicate_phone_on_edit_is_phone_taken() {
        assert_eq!(
            map_update_error(unique_violation(), Some("+919876543210")),
            UserDirectoryError::phone_taken("+919876543210")
        );
    }

    #[rstest]
    fn unique_violation_without_a_phone_edit_is_a_query_error() {
        assert!(matches!(
            map_update_error(unique_violation(), None),
            UserDirectoryError::Query { .. }
        ));
    }

    #[rstest]
    fn rows_map_onto_profiles() {
        let id = Uuid::new_v4();
        let profile = to_profile(ProfileRow {
            id,
            email: Some("ada@example.com".to_owned()),
            phone: None,
            display_name: "ada".to_owned(),
            created_at: fixture_now(),
            avatar_url: None,
            bio: None,
            address_line1: Some("1 Lamp Lane".to_owned()),
            address_line2: None,
            city: Some("Pune".to_owned()),
            state: None,
            postal_code: Some("411001".to_owned()),
            country: Some("IN".to_owned()),
            default_currency: Some("INR".to_owned()),
            preferences: Some(json!({ "newsletter": false })),
        });

        assert_eq!(profile.user.id(), &UserId::from_uuid(id));
        assert_eq!(profile.details.city.as_deref(), Some("Pune"));
        assert_eq!(profile.details.preferences, Some(json!({ "newsletter": false })));
    }
}
