//! Queue & Signage Backend
//!
//! A REST backend for ticket queues and digital signage, with SQLite
//! persistence and a WebSocket change feed.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod feed;
mod models;
mod playback;
mod queue;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use feed::ChangeFeed;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting Queue & Signage Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!(
        numbering = config.numbering.as_str(),
        utc_offset = %config.utc_offset,
        require_service_type = config.require_service_type,
        "Queue settings"
    );

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (QUEUE_API_PSK). Authentication is disabled!");
    }
    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (QUEUE_ADMIN_PSK). Account provisioning is disabled");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool, ChangeFeed::new(config.feed_capacity)));

    if let Some(email) = &config.seed_admin_email {
        repo.seed_super_admin(email).await?;
    }

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Snapshot
        .route("/snapshot", get(api::get_snapshot))
        .route("/snapshot/revision", get(api::get_revision))
        .route("/summary", get(api::get_summary))
        // Tickets
        .route(
            "/tickets",
            get(api::list_active_tickets).post(api::create_ticket),
        )
        .route("/tickets/{id}", get(api::get_ticket))
        .route("/tickets/{id}/call", post(api::call_ticket))
        .route("/tickets/{id}/complete", post(api::complete_ticket))
        // Queue views
        .route("/queue/call-next", post(api::call_next))
        .route("/queue/kiosk/{id}", get(api::get_kiosk_view))
        .route("/queue/operator", get(api::get_operator_view))
        .route("/queue/display", get(api::get_display_view))
        .route("/reports/queue", get(api::get_queue_report))
        // Service types
        .route(
            "/service-types",
            get(api::list_service_types).post(api::create_service_type),
        )
        .route("/service-types/{id}", delete(api::delete_service_type))
        // Accounts
        .route(
            "/accounts",
            get(api::list_accounts).post(api::create_account),
        )
        .route(
            "/accounts/{id}",
            get(api::get_account)
                .put(api::update_account)
                .delete(api::delete_account),
        )
        // Displays
        .route(
            "/displays",
            get(api::list_displays).post(api::create_display),
        )
        .route(
            "/displays/{id}",
            get(api::get_display)
                .put(api::update_display)
                .delete(api::delete_display),
        )
        .route("/displays/{id}/playlist", put(api::assign_playlist))
        .route("/displays/{id}/player", get(api::get_player_view))
        // Playlists and slides
        .route(
            "/playlists",
            get(api::list_playlists).post(api::create_playlist),
        )
        .route(
            "/playlists/{id}",
            get(api::get_playlist).delete(api::delete_playlist),
        )
        .route("/playlists/{id}/slides", post(api::add_slide))
        .route(
            "/slides/{id}",
            put(api::update_slide).delete(api::delete_slide),
        )
        // Change feed
        .route("/feed", get(feed::feed_socket))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
