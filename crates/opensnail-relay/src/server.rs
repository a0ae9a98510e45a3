//! HTTP server wiring
//!
//! Upload/download API, Discord sign-in, health checks and a static file
//! fallback for everything else.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::routes;
use crate::state::AppState;

/// Router settings that come from configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub static_dir: PathBuf,
    /// Maximum request body size, in bytes
    pub body_limit: usize,
    pub cors_origins: Vec<String>,
}

/// Create the HTTP router
pub fn create_router(state: AppState, options: RouterOptions) -> Router {
    let static_files = ServeDir::new(&options.static_dir)
        .fallback(ServeFile::new(options.static_dir.join("index.html")));

    Router::new()
        // Health
        .route("/health", get(routes::health::health))
        .route("/extra/up", get(routes::health::up))
        // Uploads
        .route("/api/upload", post(routes::upload::upload))
        .route("/api/download/{filename}", get(routes::download::download))
        .route(
            "/api/download/tempshare/{code}",
            get(routes::download::tempshare),
        )
        // Discord sign-in
        .route("/auth/discord", get(routes::auth::login))
        .route("/auth/discord/callback", get(routes::auth::callback))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/api/userdata", get(routes::auth::userdata))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(options.body_limit))
        .layer(cors_layer(&options.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    }
}

/// Serve until Ctrl-C
pub async fn start_server(router: Router, port: u16) -> std::io::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
