//! Documentation of a Discord profile viewer.
//!
//! Look up any Discord account by id and get back a profile card: name, avatar,
//! banner, account age, badges, status, activity and linked accounts.
//!
//!
//!
//! # Where Data Comes From
//!
//! - A logged-in user's own OAuth token, when they look themselves (or anyone) up
//! - The bot, through a direct user lookup and then the guilds it shares with the target
//! - Otherwise a mock derived from the id's digits, identical on every request
//!
//! A response never says which of these it came from. Downstream failures only ever
//! degrade to mock data; the only errors a caller sees are a malformed id (400), a
//! missing login on `/api/me` (401), and genuine internal failures (500).
//!
//!
//!
//! # Endpoints
//!
//! - `GET /api/profile/:id`, `/api/status/:id`, `/api/presence/:id`, `/api/connections/:id`, `/api/user/:id`
//! - `GET /api/me` for the logged-in user
//! - `GET /auth/discord`, `/auth/discord/callback`, `/auth/logout`
//! - `POST /webhook/discord` and `GET /webhook-profile`
//! - `GET /health`
//! - Everything else is a static file from `STATIC_DIR`, with `404.html` as the miss page
//!
//!
//!
//! # Notes
//!
//! ## Memory only
//! Profiles (30 minutes), presences (15 minutes) and sessions (a week) live in `DashMap`s and
//! vanish on restart. Two instances never share anything, so sticky routing is on the deployer.
//!
//! ## Serverless
//! With `VERCEL=1` nothing long-lived survives between invocations, so the bot connects on the
//! first request of each instance instead of at startup.
//!
//! ## Ids
//! Ids are 17-19 ASCII digits and always handled as `u64`. The creation time is the top 42 bits
//! plus the Discord epoch.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run with real Discord data.
//! ```sh
//! DISCORD_BOT_TOKEN=... RUST_LOG=info cargo run -p profile-viewer
//! ```
//!
//! Run with mock data only.
//! ```sh
//! RUST_LOG=debug cargo run -p profile-viewer
//! ```
//!
//! Look up one id from the terminal.
//! ```sh
//! cargo run -p lookup -- 80351110224678912 --live
//! ```
use std::{any::Any, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod cache;
pub mod config;
pub mod discord;
pub mod error;
pub mod id;
pub mod mock;
pub mod models;
pub mod pipeline;
pub mod presence;
pub mod resolver;
pub mod routes;
pub mod snowflake;
pub mod state;

use auth::{callback_handler, login_handler, logout_handler, me_handler};
use cache::spawn_sweeper;
use config::Config;
use error::AppError;
use routes::{
    connections_handler, health_handler, presence_handler, profile_handler, status_handler,
    user_handler, webhook_handler, webhook_profile_handler,
};
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let config = Config::load()?;
    let state = AppState::new(config)?;

    if !state.config.lazy_connect {
        let resolver = state.pipeline.resolver().clone();
        tokio::spawn(async move { resolver.ensure_connected().await });
    }

    spawn_sweeper(
        state.cache.clone(),
        state.sessions.clone(),
        state.config.sweep_interval,
    );

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

pub fn app(state: Arc<AppState>) -> Router {
    app_with(state, Router::new())
}

/// Like [`app`], with `extra` routes mounted under the same layers.
pub fn app_with(state: Arc<AppState>, extra: Router<Arc<AppState>>) -> Router {
    let production = state.config.production;
    let static_dir = state.config.static_dir.clone();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let pages = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(static_dir.join("404.html")));

    Router::new()
        .route("/api/profile/:id", get(profile_handler))
        .route("/api/status/:id", get(status_handler))
        .route("/api/presence/:id", get(presence_handler))
        .route("/api/connections/:id", get(connections_handler))
        .route("/api/user/:id", get(user_handler))
        .route("/api/me", get(me_handler))
        .route("/auth/discord", get(login_handler))
        .route("/auth/discord/callback", get(callback_handler))
        .route("/auth/logout", get(logout_handler))
        .route("/webhook/discord", post(webhook_handler))
        .route("/webhook-profile", get(webhook_profile_handler))
        .route("/health", get(health_handler))
        .merge(extra)
        .route_service("/profile", ServeFile::new(static_dir.join("profile.html")))
        .fallback_service(pages)
        .layer(CatchPanicLayer::custom(move |panic| panic_response(panic, production)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, production: bool) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string();

    AppError::internal("Internal server error", anyhow::anyhow!(detail))
        .for_mode(production)
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
