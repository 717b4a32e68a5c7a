//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, UpdateUser, User};
use crate::repository::UserRepository;

pub const DEFAULT_COLLECTION: &str = "users";

const DUPLICATE_KEY: i32 = 11000;

/// Stored shape of a user: `_id` as a BSON UUID, `createdAt` as a BSON date
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    name: String,
    email: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    created_at: Option<bson::DateTime>,
}

impl UserDocument {
    fn from_new(id: Uuid, input: &NewUser) -> Self {
        Self {
            id: bson::Uuid::from_bytes(id.into_bytes()),
            name: input.name.clone(),
            email: input.email.clone(),
            created_at: Some(bson::DateTime::from_millis(input.created_at.timestamp_millis())),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = UserError;

    fn try_from(doc: UserDocument) -> UserResult<Self> {
        let created_at = doc
            .created_at
            .map(|stored| {
                let millis = stored.timestamp_millis();
                DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
                    UserError::Database(format!("createdAt out of range: {}", millis))
                })
            })
            .transpose()?;

        Ok(User {
            id: Uuid::from_bytes(doc.id.bytes()),
            name: doc.name,
            email: doc.email,
            created_at,
        })
    }
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": bson::Uuid::from_bytes(id.into_bytes()) }
}

fn set_document(changes: UpdateUser) -> Document {
    let mut set = Document::new();

    if let Some(name) = changes.name {
        set.insert("name", name);
    }

    if let Some(email) = changes.email {
        set.insert("email", email);
    }

    set
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Map a write error, turning a unique-index violation into `DuplicateName`.
fn write_error(err: mongodb::error::Error, name: &str) -> UserError {
    if is_duplicate_key(&err) {
        UserError::DuplicateName(name.to_string())
    } else {
        err.into()
    }
}

/// MongoDB implementation of the UserRepository
pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
}

impl MongoUserRepository {
    /// Repository over the `users` collection of `db`
    ///
    /// ```ignore
    /// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
    /// let repo = MongoUserRepository::new(client.database("directory"));
    /// repo.create_indexes().await?;
    /// ```
    pub fn new(db: Database) -> Self {
        Self::with_collection(db, DEFAULT_COLLECTION)
    }

    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        let collection = db.collection::<UserDocument>(collection_name);
        Self { collection }
    }

    /// Ensure the unique index on `name`. Idempotent.
    #[instrument(skip(self), fields(collection = %self.collection.name()))]
    pub async fn create_indexes(&self) -> UserResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("users_name_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(index).await?;

        tracing::info!("User indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, input), fields(user_name = %input.name))]
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let id = Uuid::now_v7();
        let document = UserDocument::from_new(id, &input);

        self.collection
            .insert_one(&document)
            .await
            .map_err(|e| write_error(e, &input.name))?;

        tracing::info!(user_id = %id, "User created successfully");
        document.try_into()
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> UserResult<Option<User>> {
        let document = self.collection.find_one(doc! { "name": name }).await?;
        document.map(User::try_from).transpose()
    }

    #[instrument(skip(self, changes))]
    async fn update_by_id(&self, id: Uuid, changes: UpdateUser) -> UserResult<bool> {
        let new_name = changes.name.clone();
        let set = set_document(changes);

        if set.is_empty() {
            let count = self.collection.count_documents(id_filter(id)).await?;
            return Ok(count > 0);
        }

        let result = self
            .collection
            .update_one(id_filter(id), doc! { "$set": set })
            .await
            .map_err(|e| write_error(e, new_name.as_deref().unwrap_or_default()))?;

        if result.matched_count > 0 {
            tracing::info!(user_id = %id, "User updated successfully");
        }
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: Uuid) -> UserResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;

        if result.deleted_count > 0 {
            tracing::info!(user_id = %id, "User deleted successfully");
        }
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn exists_by_name(&self, name: &str) -> UserResult<bool> {
        let count = self.collection.count_documents(doc! { "name": name }).await?;
        Ok(count > 0)
    }
}
