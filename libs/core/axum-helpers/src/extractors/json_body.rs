//! JSON body extractor with a uniform 400 rejection.

use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;

/// Like [`axum::Json`], but every rejection (missing content type, syntax
/// error, wrong shape, empty body) becomes [`AppError::JsonExtractorRejection`],
/// which renders as `400` in the shared error envelope.
///
/// # Example
/// ```ignore
/// use axum_helpers::extractors::JsonBody;
///
/// async fn sign_up(JsonBody(input): JsonBody<CreateUser>) -> StatusCode {
///     StatusCode::CREATED
/// }
/// ```
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}
