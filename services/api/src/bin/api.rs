//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{build_provider, SqliteStore},
    config::Config,
    error::ApiError,
    web::{build_router, oauth::GoogleReconciler, AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use std::sync::Arc;
use thetamind_core::orchestrator::TutorOrchestrator;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Store & Create the Schema ---
    let store = Arc::new(SqliteStore::from_url(&config.database_url)?);
    store.init_schema().await?;
    info!("Database schema ready at {}", config.database_url);

    // --- 3. Build the AI Provider & Orchestrator ---
    let provider = build_provider(&config);
    let tutor = Arc::new(TutorOrchestrator::new(provider));

    // --- 4. Build the Federated Login Reconciler (optional) ---
    let google = match (&config.google_client_id, &config.google_client_secret) {
        (Some(id), Some(secret)) => Some(Arc::new(
            GoogleReconciler::new(
                id.clone(),
                secret.clone(),
                config.google_redirect_url.clone(),
            )
            .map_err(ApiError::Internal)?,
        )),
        _ => {
            info!("Google federation disabled: no client credentials configured");
            None
        }
    };

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        users: store.clone(),
        sessions: store.clone(),
        history: store,
        tutor,
        google,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let app = build_router(app_state).layer(cors);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
