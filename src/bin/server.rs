//! soulkeeper HTTP server binary.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `SOULKEEPER_STORAGE_DIR` — profile storage root (default: platform
//!   data directory)
//! - `RUST_LOG` — tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use soulkeeper::server::{app_router, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,soulkeeper=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_addr = format!("0.0.0.0:{}", port);

    let state = AppState::open_default().expect("Failed to open profile store");
    let app = app_router(state);

    tracing::info!("soulkeeper server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                — liveness probe");
    tracing::info!("  GET    /profiles              — list profiles");
    tracing::info!("  POST   /profiles              — create profile");
    tracing::info!("  POST   /profiles/update       — merge observations");
    tracing::info!("  GET    /profiles/:id          — fetch profile");
    tracing::info!("  DELETE /profiles/:id          — delete profile");
    tracing::info!("  GET    /profiles/:id/soul     — narrative document");
    tracing::info!("  GET    /profiles/:id/identity — structured document");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .expect("Server failed");
}
