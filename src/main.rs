pub mod api;
mod config;
mod models;
mod providers;
mod relay;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use providers::{fcm::FcmClient, feed::FeedClient};
use relay::RelayManager;

#[derive(OpenApi)]
#[openapi(
    info(title = "Metro Disruption Relay", version = "0.1.0"),
    paths(
        api::disruptions::list_disruptions,
        api::check::run_check,
        api::devices::register_device,
        api::notifications::send_test_notification,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::disruptions::DisruptionListResponse,
        api::devices::RegisterDeviceRequest,
        api::devices::RegisterDeviceResponse,
        api::notifications::TestNotificationRequest,
        api::notifications::TestNotificationResponse,
        api::health::HealthResponse,
        api::health::LastCycle,
        models::Disruption,
        models::PriorityLevel,
        relay::CycleReport,
        relay::CycleOutcome,
        relay::DispatchReport,
        relay::TopicDispatch,
    )),
    tags(
        (name = "disruptions", description = "Committed disruption snapshot"),
        (name = "check", description = "Manual check-cycle trigger"),
        (name = "devices", description = "Push device registration"),
        (name = "notifications", description = "Test notifications"),
        (name = "health", description = "Service health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    config.feed.validate();
    tracing::info!(
        routes = config.feed.routes.len(),
        stations = config.feed.stations.len(),
        interval_secs = config.feed.interval_secs,
        "Loaded configuration"
    );

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database
    let db_path = std::env::current_dir()
        .expect("Failed to get current directory")
        .join("database");
    if let Err(e) = std::fs::create_dir_all(&db_path) {
        tracing::warn!("Could not create database directory: {}", e);
    }
    let db_url = format!("sqlite:{}?mode=rwc", db_path.join("data.db").display());
    let pool = SqlitePool::connect(&db_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(migrations = migrator.migrations.len(), "Found migrations");
    migrator
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Build the feed and push clients and start the relay in the background
    let feed_client = FeedClient::new(&config.feed).expect("Failed to build feed client");
    let fcm_client = FcmClient::new(&config.push).expect("Failed to build push client");
    let relay = Arc::new(RelayManager::new(
        feed_client,
        fcm_client,
        pool.clone(),
        &config,
    ));
    let snapshot_store = relay.snapshot_store();
    let cycle_tx = relay.cycle_report_sender();
    let relay_clone = relay.clone();
    tokio::spawn(async move {
        relay_clone.start().await;
    });

    // Build the app
    let app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(pool.clone(), relay, snapshot_store, cycle_tx))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Metro Disruption Relay"
}
