//! Handler tests for the Users domain against a real MongoDB
//!
//! These exercise the users router end to end over a containerized store:
//! status codes, response bodies, merge semantics and the unique name index.
//! They need Docker, so they are ignored by default:
//!
//! ```text
//! cargo test -p domain_users --test handler_test -- --ignored
//! ```

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{TimeDelta, Utc};
use domain_users::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_utils::assertions::{assert_message, assert_some};
use test_utils::{TestDataBuilder, TestMongo};
use tower::ServiceExt; // For oneshot()

async fn app(mongo: &TestMongo) -> Router {
    let repo = MongoUserRepository::new(mongo.database());
    repo.create_indexes().await.unwrap();
    handlers::router(UserService::new(repo))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_sign_up_then_get_round_trip() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;
    let builder = TestDataBuilder::from_test_name("round_trip");
    let name = builder.name("user", "alice");
    let email = builder.email("alice");

    let before = Utc::now() - TimeDelta::seconds(1);
    let (status, body) = call(
        &app,
        Method::POST,
        "/signUp",
        Some(json!({"name": name, "email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: UserCreated = serde_json::from_str(&body).unwrap();
    assert_eq!(created.message, "User created");

    let (status, body) = call(&app, Method::GET, &format!("/getUser?name={}", name), None).await;
    assert_eq!(status, StatusCode::OK);

    let user: User = serde_json::from_str(&body).unwrap();
    assert_eq!(user.id, created.id);
    assert_eq!(user.name, name);
    assert_eq!(user.email, email);
    let created_at = assert_some(user.created_at, "createdAt");
    assert!(created_at >= before);
    assert!(created_at <= Utc::now());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_duplicate_sign_up_conflicts() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;
    let payload = json!({"name": "Alice", "email": "alice@example.com"});

    let (status, _) = call(&app, Method::POST, "/signUp", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(&app, Method::POST, "/signUp", Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_unique_index_rejects_direct_duplicate_insert() {
    let mongo = TestMongo::new().await;
    let repo = MongoUserRepository::new(mongo.database());
    repo.create_indexes().await.unwrap();

    let new_user = NewUser {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        created_at: Utc::now(),
    };
    repo.create(new_user.clone()).await.unwrap();

    let err = repo.create(new_user).await.unwrap_err();
    assert!(matches!(err, UserError::DuplicateName(name) if name == "Alice"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_partial_update_keeps_other_fields() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;

    call(
        &app,
        Method::POST,
        "/signUp",
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
    )
    .await;
    let (_, body) = call(&app, Method::GET, "/getUser?name=Alice", None).await;
    let original: User = serde_json::from_str(&body).unwrap();

    let (status, body) = call(
        &app,
        Method::PUT,
        "/updateUser?name=Alice",
        Some(json!({"email": "alice@new.example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_message(&body, "User updated successfully");

    let (_, body) = call(&app, Method::GET, "/getUser?name=Alice", None).await;
    let updated: User = serde_json::from_str(&body).unwrap();
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.name, "Alice");
    assert_eq!(updated.email, "alice@new.example.com");
    assert_eq!(updated.created_at, original.created_at);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_rename_moves_lookup_key() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;

    call(
        &app,
        Method::POST,
        "/signUp",
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
    )
    .await;

    let (status, _) = call(
        &app,
        Method::PUT,
        "/updateUser?name=Alice",
        Some(json!({"name": "Alicia"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::GET, "/getUser?name=Alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::GET, "/getUser?name=Alicia", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_delete_fresh_account_is_forbidden_and_kept() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;

    call(
        &app,
        Method::POST,
        "/signUp",
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
    )
    .await;

    let (status, body) = call(&app, Method::DELETE, "/deleteUser?name=Alice", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_message(&body, "Cannot delete accounts less than 1 minute old");

    let (status, _) = call(&app, Method::GET, "/getUser?name=Alice", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_delete_old_account_then_repeat_is_not_found() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;

    let seed_repo = MongoUserRepository::new(mongo.database());
    seed_repo
        .create(NewUser {
            name: "Veteran".to_string(),
            email: "veteran@example.com".to_string(),
            created_at: Utc::now() - TimeDelta::minutes(2),
        })
        .await
        .unwrap();

    let (status, body) = call(&app, Method::DELETE, "/deleteUser?name=Veteran", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_message(&body, "User deleted successfully");

    let (status, _) = call(&app, Method::DELETE, "/deleteUser?name=Veteran", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let found = seed_repo.find_by_name("Veteran").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_lookup_is_case_sensitive() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;

    call(
        &app,
        Method::POST,
        "/signUp",
        Some(json!({"name": "Alice", "email": "alice@example.com"})),
    )
    .await;

    let (status, _) = call(&app, Method::GET, "/getUser?name=alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let repo = MongoUserRepository::new(mongo.database());
    let user = assert_some(repo.find_by_name("Alice").await.unwrap(), "exact match");
    assert_eq!(user.email, "alice@example.com");
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_record_without_created_at_is_readable_and_deletable() {
    let mongo = TestMongo::new().await;
    let app = app(&mongo).await;

    mongo
        .database()
        .collection::<::mongodb::bson::Document>("users")
        .insert_one(::mongodb::bson::doc! {
            "_id": ::mongodb::bson::Uuid::new(),
            "name": "Legacy",
            "email": "legacy@example.com",
        })
        .await
        .unwrap();

    let (status, body) = call(&app, Method::GET, "/getUser?name=Legacy", None).await;
    assert_eq!(status, StatusCode::OK);
    let user: User = serde_json::from_str(&body).unwrap();
    assert!(user.created_at.is_none());

    let (status, body) = call(&app, Method::DELETE, "/deleteUser?name=Legacy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_message(&body, "User deleted successfully");
}
