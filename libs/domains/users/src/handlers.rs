use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use axum_helpers::{
    JsonBody, QueryParams,
    errors::handlers::method_not_allowed,
    errors::responses::{
        BadRequestResponse, ConflictResponse, ForbiddenResponse, InternalServerErrorResponse,
        MethodNotAllowedResponse, NotFoundResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::models::{CreateUser, MessageResponse, UpdateUser, User, UserCreated, UserNameQuery};
use crate::repository::UserRepository;
use crate::service::UserService;

/// OpenAPI documentation for the Users API
#[derive(OpenApi)]
#[openapi(
    paths(sign_up, get_user, update_user, delete_user),
    components(
        schemas(User, CreateUser, UpdateUser, UserCreated, MessageResponse),
        responses(
            BadRequestResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            MethodNotAllowedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Users", description = "User directory endpoints")
    )
)]
pub struct ApiDoc;

/// Create the users router
///
/// Each endpoint accepts exactly one verb; any other verb gets a plain-text
/// 405 without touching the store. `get` also answers HEAD, so `/getUser`
/// routes HEAD to the 405 explicitly.
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/signUp", post(sign_up::<R>).fallback(method_not_allowed))
        .route(
            "/getUser",
            get(get_user::<R>)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/updateUser",
            put(update_user::<R>).fallback(method_not_allowed),
        )
        .route(
            "/deleteUser",
            delete(delete_user::<R>).fallback(method_not_allowed),
        )
        .with_state(shared_service)
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/signUp",
    tag = "Users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserCreated),
        (status = 400, response = BadRequestResponse),
        (status = 405, response = MethodNotAllowedResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn sign_up<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    JsonBody(input): JsonBody<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserCreated {
            id: user.id,
            message: "User created".to_string(),
        }),
    ))
}

/// Fetch a user by exact name
#[utoipa::path(
    get,
    path = "/getUser",
    tag = "Users",
    params(UserNameQuery),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 405, response = MethodNotAllowedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    QueryParams(query): QueryParams<UserNameQuery>,
) -> UserResult<Json<User>> {
    let name = query.required()?;
    let user = service.get_user(&name).await?;
    Ok(Json(user))
}

/// Merge the supplied fields into an existing user
#[utoipa::path(
    put,
    path = "/updateUser",
    tag = "Users",
    params(UserNameQuery),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 405, response = MethodNotAllowedResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    QueryParams(query): QueryParams<UserNameQuery>,
    JsonBody(changes): JsonBody<UpdateUser>,
) -> UserResult<Json<MessageResponse>> {
    let name = query.required()?;
    service.update_user(&name, changes).await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// Delete a user at least one minute old
#[utoipa::path(
    delete,
    path = "/deleteUser",
    tag = "Users",
    params(UserNameQuery),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 405, response = MethodNotAllowedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    QueryParams(query): QueryParams<UserNameQuery>,
) -> UserResult<Json<MessageResponse>> {
    let name = query.required()?;
    service.delete_user(&name).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UserError;
    use crate::repository::MockUserRepository;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::{TimeDelta, Utc};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(repo: MockUserRepository) -> Router {
        router(UserService::new(repo))
    }

    fn stored(name: &str, age: TimeDelta) -> User {
        User {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: "alice@example.com".to_string(),
            created_at: Some(Utc::now() - age),
        }
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_sign_up_returns_created() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_name().returning(|_| Ok(false));
        repo.expect_create().returning(|input| {
            Ok(User {
                id: Uuid::now_v7(),
                name: input.name,
                email: input.email,
                created_at: Some(input.created_at),
            })
        });

        let (status, body) = send(
            app(repo),
            request(
                Method::POST,
                "/signUp",
                Some(json!({"name": "Alice", "email": "alice@example.com"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User created");
        assert!(body["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_sign_up_validation_messages() {
        let cases = [
            (json!({"email": "a@b.com"}), "Missing name or email"),
            (json!({"name": "", "email": "a@b.com"}), "Missing name or email"),
            (
                json!({"name": "김철수", "email": "kim@example.com"}),
                "Name cannot contain Korean characters",
            ),
            (
                json!({"name": "Alice", "email": "alice.example.com"}),
                "Invalid email format: must contain @ symbol",
            ),
        ];

        for (payload, expected) in cases {
            let repo = MockUserRepository::new();
            let (status, body) =
                send(app(repo), request(Method::POST, "/signUp", Some(payload))).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], expected);
        }
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_name_conflicts() {
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_name().returning(|_| Ok(true));
        repo.expect_create().never();

        let (status, body) = send(
            app(repo),
            request(
                Method::POST,
                "/signUp",
                Some(json!({"name": "Alice", "email": "alice@example.com"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_sign_up_malformed_json_is_bad_request() {
        let repo = MockUserRepository::new();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/signUp")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _) = send(app(repo), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_verb_is_method_not_allowed_without_store_access() {
        let routes = [
            (Method::GET, "/signUp"),
            (Method::POST, "/getUser?name=Alice"),
            (Method::HEAD, "/getUser?name=Alice"),
            (Method::GET, "/updateUser?name=Alice"),
            (Method::POST, "/deleteUser?name=Alice"),
        ];

        for (method, uri) in routes {
            // HEAD responses carry no body.
            let is_head = method == Method::HEAD;
            // No expectations: any repository call would panic.
            let repo = MockUserRepository::new();
            let response = app(repo)
                .oneshot(request(method, uri, None))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            if !is_head {
                let bytes = response.into_body().collect().await.unwrap().to_bytes();
                assert_eq!(&bytes[..], b"Method Not Allowed");
            }
        }
    }

    #[tokio::test]
    async fn test_get_user_returns_record() {
        let user = stored("Alice", TimeDelta::minutes(5));
        let expected_id = user.id.to_string();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name()
            .withf(|name: &str| name == "Alice")
            .returning(move |_| Ok(Some(user.clone())));

        let (status, body) = send(app(repo), request(Method::GET, "/getUser?name=Alice", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], expected_id);
        assert_eq!(body["name"], "Alice");
        assert_eq!(body["email"], "alice@example.com");
        assert!(body["createdAt"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_get_user_missing_query_is_bad_request() {
        let repo = MockUserRepository::new();
        let (status, body) = send(app(repo), request(Method::GET, "/getUser", None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing user name in query");
    }

    #[tokio::test]
    async fn test_repeated_name_query_is_json_bad_request() {
        for (method, uri) in [
            (Method::GET, "/getUser?name=a&name=b"),
            (Method::DELETE, "/deleteUser?name=a&name=b"),
        ] {
            let repo = MockUserRepository::new();
            let response = app(repo).oneshot(request(method, uri, None)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()["content-type"], "application/json");

            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["error"], "QUERY_EXTRACTION");
        }
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name().returning(|_| Ok(None));

        let (status, body) = send(app(repo), request(Method::GET, "/getUser?name=Ghost", None)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }

    #[tokio::test]
    async fn test_get_user_storage_fault_passes_message_through() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name()
            .returning(|_| Err(UserError::Database("server selection timeout".to_string())));

        let (status, body) = send(app(repo), request(Method::GET, "/getUser?name=Alice", None)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "server selection timeout");
    }

    #[tokio::test]
    async fn test_update_user_success() {
        let user = stored("Alice", TimeDelta::minutes(5));

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_update_by_id().times(1).returning(|_, _| Ok(true));

        let (status, body) = send(
            app(repo),
            request(
                Method::PUT,
                "/updateUser?name=Alice",
                Some(json!({"email": "alice@new.example.com"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User updated successfully");
    }

    #[tokio::test]
    async fn test_update_user_rejects_created_at() {
        let repo = MockUserRepository::new();
        let (status, _) = send(
            app(repo),
            request(
                Method::PUT,
                "/updateUser?name=Alice",
                Some(json!({"createdAt": "2020-01-01T00:00:00Z"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_user_without_body_is_bad_request() {
        let repo = MockUserRepository::new();
        let (status, _) = send(app(repo), request(Method::PUT, "/updateUser?name=Alice", None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_user_missing_query_is_bad_request() {
        let repo = MockUserRepository::new();
        let (status, body) = send(
            app(repo),
            request(Method::PUT, "/updateUser", Some(json!({"email": "a@b.com"}))),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing user name in query");
    }

    #[tokio::test]
    async fn test_update_user_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name().returning(|_| Ok(None));

        let (status, _) = send(
            app(repo),
            request(Method::PUT, "/updateUser?name=Ghost", Some(json!({}))),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_user_too_young_is_forbidden() {
        let user = stored("Alice", TimeDelta::seconds(30));

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_delete_by_id().never();

        let (status, body) =
            send(app(repo), request(Method::DELETE, "/deleteUser?name=Alice", None)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Cannot delete accounts less than 1 minute old");
    }

    #[tokio::test]
    async fn test_delete_user_old_enough_succeeds() {
        let user = stored("Alice", TimeDelta::seconds(61));

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_delete_by_id().times(1).returning(|_| Ok(true));

        let (status, body) =
            send(app(repo), request(Method::DELETE, "/deleteUser?name=Alice", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deleted successfully");
    }

    #[tokio::test]
    async fn test_delete_user_not_found_on_every_attempt() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_name().times(2).returning(|_| Ok(None));
        repo.expect_delete_by_id().never();
        let app = app(repo);

        for _ in 0..2 {
            let (status, body) = send(
                app.clone(),
                request(Method::DELETE, "/deleteUser?name=Ghost", None),
            )
            .await;

            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "User not found");
        }
    }

    #[test]
    fn test_openapi_lists_all_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/signUp", "/getUser", "/updateUser", "/deleteUser"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
