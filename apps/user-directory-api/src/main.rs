use axum::Router;
use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::MongoUserRepository;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

/// API routes under `/api`, docs, middleware and `/health`
fn build_app(state: &AppState) -> std::io::Result<Router> {
    let api_routes = api::routes(state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes, &state.config.server)?;

    Ok(router.merge(health_router(state.config.app)))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    info!("Connecting to MongoDB at {}", config.mongodb.redacted_url());

    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;

    let db = mongo_client.database(config.mongodb.database());

    info!(
        database = config.mongodb.database(),
        collection = %config.users_collection,
        "Successfully connected to MongoDB"
    );

    MongoUserRepository::with_collection(db.clone(), &config.users_collection)
        .create_indexes()
        .await?;

    let state = AppState {
        config,
        mongo_client,
        db,
    };

    let app = build_app(&state)?;
    let mongo_client = state.mongo_client.clone();

    info!("Starting User Directory API (30s shutdown timeout)");

    create_production_app(
        app,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing MongoDB connections");
            mongo_client.shutdown().await;
            info!("MongoDB connection closed successfully");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("User Directory API shutdown complete");
    Ok(())
}
