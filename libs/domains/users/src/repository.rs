use async_trait::async_trait;
use uuid::Uuid;

use crate::error::UserResult;
use crate::models::{NewUser, UpdateUser, User};

/// Repository trait for User persistence
///
/// Names are the lookup key; ids are only used to address a record that
/// has already been found by name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user and return it with its assigned id
    async fn create(&self, input: NewUser) -> UserResult<User>;

    /// First user whose name matches exactly
    async fn find_by_name(&self, name: &str) -> UserResult<Option<User>>;

    /// Apply the supplied fields; `false` when no record has this id
    async fn update_by_id(&self, id: Uuid, changes: UpdateUser) -> UserResult<bool>;

    /// Remove a user; `false` when no record has this id
    async fn delete_by_id(&self, id: Uuid) -> UserResult<bool>;

    async fn exists_by_name(&self, name: &str) -> UserResult<bool>;
}
