//! HTTP boundary (§6). Thin by design: it only calls into `Store`,
//! `Supervisor` and `ApiStatus` handles the core already built and
//! serializes their results to JSON. No business logic lives here.

mod error;
mod handlers;
mod ratelimit;

use crate::config::WebserverConfig;
use crate::logger::{self, LogTag};
use crate::status::ApiStatus;
use crate::store::Store;
use crate::supervisor::Supervisor;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use ratelimit::RateLimiter;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub struct AppState {
    pub store: Store,
    pub supervisor: Arc<Supervisor>,
    pub status: Arc<ApiStatus>,
    pub mock_mode: bool,
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        match origin.parse::<axum::http::HeaderValue>() {
            Ok(value) => CorsLayer::new().allow_origin(value).allow_methods(Any).allow_headers(Any),
            Err(_) => {
                logger::warning(LogTag::Webserver, &format!("CORS_ORIGIN '{}' is not a valid header value, falling back to '*'", origin));
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            }
        }
    }
}

fn build_router(state: Arc<AppState>, config: &WebserverConfig) -> Router {
    let limiter = Arc::new(RateLimiter::new(config));
    let api_key = config.api_key.clone().map(Arc::new);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/dashboard", get(handlers::dashboard))
        .route("/wallets", get(handlers::list_wallets))
        .route("/wallets/activity", get(handlers::wallets_activity))
        .route("/wallets/:address", get(handlers::get_wallet))
        .route("/wallets/:address/status", post(handlers::set_wallet_status))
        .route("/trades", get(handlers::list_trades))
        .route("/discovered", get(handlers::list_discovered))
        .route("/discovered/:address/promote", post(handlers::promote_discovered))
        .route("/discover", post(handlers::trigger_discover))
        .route("/track", post(handlers::trigger_track))
        .route("/system/status", get(handlers::system_status))
        .route("/connections/status", get(handlers::system_status))
        .layer(middleware::from_fn_with_state(api_key, ratelimit::require_api_key))
        .layer(middleware::from_fn_with_state(limiter, ratelimit::enforce))
        .with_state(state)
}

/// Blocks serving the HTTP API until the supervisor's shutdown flag flips.
/// A no-op, successful return if the webserver is disabled in config.
pub async fn run(state: AppState, config: WebserverConfig) -> anyhow::Result<()> {
    if !config.enabled {
        logger::info(LogTag::Webserver, "webserver disabled, not starting");
        return Ok(());
    }

    let shutdown = state.supervisor.shutdown_flag();
    let bind_addr = config.bind_addr.clone();
    let cors = cors_layer(&config.cors_origin);
    let router = build_router(Arc::new(state), &config).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    logger::info(LogTag::Webserver, &format!("listening on {}", bind_addr));

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            loop {
                if shutdown.load(Ordering::SeqCst) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        })
        .await?;

    logger::info(LogTag::Webserver, "webserver shut down");
    Ok(())
}
