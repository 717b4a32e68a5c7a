//! User Service - Business logic layer

use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, UpdateUser, User};
use crate::repository::UserRepository;
use crate::validation;

/// User service providing the directory operations
///
/// Validation and the deletion guard live here; the repository only stores.
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Register a user, stamping `createdAt` with the current time
    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        let new_user = input.into_new_user(Utc::now())?;

        if self.repository.exists_by_name(&new_user.name).await? {
            return Err(UserError::DuplicateName(new_user.name));
        }

        self.repository.create(new_user).await
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, name: &str) -> UserResult<User> {
        self.repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| UserError::NotFound(name.to_string()))
    }

    /// Merge the supplied fields into the user called `name`
    #[instrument(skip(self, changes))]
    pub async fn update_user(&self, name: &str, changes: UpdateUser) -> UserResult<()> {
        changes
            .validate()
            .map_err(|e| UserError::Validation(validation::first_message(&e)))?;

        let existing = self.get_user(name).await?;

        if changes.is_empty() {
            return Ok(());
        }

        if let Some(ref new_name) = changes.name {
            if *new_name != existing.name && self.repository.exists_by_name(new_name).await? {
                return Err(UserError::DuplicateName(new_name.clone()));
            }
        }

        if !self.repository.update_by_id(existing.id, changes).await? {
            return Err(UserError::NotFound(name.to_string()));
        }

        Ok(())
    }

    /// Delete the user called `name` once the account is at least a minute old
    ///
    /// Records without a creation time are not age-checked.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, name: &str) -> UserResult<()> {
        let existing = self.get_user(name).await?;
        let now = Utc::now();

        if existing
            .created_at
            .is_some_and(|created_at| !validation::is_old_enough_to_delete(created_at, now))
        {
            tracing::info!(user_id = %existing.id, "Refusing to delete recently created account");
            return Err(UserError::TooYoungToDelete);
        }

        if !self.repository.delete_by_id(existing.id).await? {
            return Err(UserError::NotFound(name.to_string()));
        }

        Ok(())
    }
}
