use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::validation::{self, MISSING_FIELDS, MISSING_NAME_QUERY};

/// User entity as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier assigned on creation
    pub id: Uuid,
    /// Lookup key for read, update and delete
    pub name: String,
    pub email: String,
    /// Set once on creation, never modified. Absent on records written
    /// without a creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Sign-up payload
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(
        required(code = "missing", message = "Missing name or email"),
        length(min = 1, code = "missing", message = "Missing name or email"),
        custom(function = "validation::validate_no_hangul")
    )]
    #[schema(example = "Alice")]
    pub name: Option<String>,

    #[validate(
        required(code = "missing", message = "Missing name or email"),
        length(min = 1, code = "missing", message = "Missing name or email"),
        custom(function = "validation::validate_has_at_sign")
    )]
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
}

/// A validated sign-up, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl CreateUser {
    /// Run the sign-up rules and stamp the record with `created_at`.
    pub fn into_new_user(self, created_at: DateTime<Utc>) -> UserResult<NewUser> {
        self.validate()
            .map_err(|e| UserError::Validation(validation::first_message(&e)))?;

        match (self.name, self.email) {
            (Some(name), Some(email)) => Ok(NewUser {
                name,
                email,
                created_at,
            }),
            _ => Err(UserError::Validation(MISSING_FIELDS.to_string())),
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    #[schema(example = "Alice Cooper")]
    pub name: Option<String>,

    #[validate(custom(function = "validation::validate_has_at_sign"))]
    #[schema(example = "alice@new.example.com")]
    pub email: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// The `?name=` query parameter
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserNameQuery {
    /// Exact, case-sensitive user name
    pub name: Option<String>,
}

impl UserNameQuery {
    /// The requested name, rejecting a missing or empty parameter.
    pub fn required(self) -> UserResult<String> {
        match self.name {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(UserError::Validation(MISSING_NAME_QUERY.to_string())),
        }
    }
}

/// Response body for a successful sign-up
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreated {
    pub id: Uuid,
    #[schema(example = "User created")]
    pub message: String,
}

/// Confirmation body for update and delete
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
