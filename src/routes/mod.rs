// Routes module - wires every HTTP endpoint to its handler

use crate::app_state::SharedState;
use crate::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Endpoint table, printed at startup
pub const ENDPOINTS: [(&str, &str, &str); 10] = [
    ("POST", "/rpc/submit", "Submit a signed request"),
    ("GET", "/rpc/nonce/:address", "Last nonce used by a signer"),
    ("GET", "/markets", "List markets"),
    ("GET", "/markets/:id", "Market details"),
    ("GET", "/markets/:id/snapshot", "Vault balance and outcome supplies"),
    ("GET", "/markets/:id/positions/:owner", "Balances of one owner"),
    ("GET", "/markets/:id/journal", "Committed transitions"),
    ("GET", "/devnet/accounts", "Development accounts"),
    ("GET", "/health", "Service health and stats"),
    ("GET", "/", "Service health and stats"),
];

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== STATE-CHANGING (SIGNED) =====
        .route("/rpc/submit", post(submit_request))
        .route("/rpc/nonce/:address", get(get_nonce))
        // ===== MARKET READS =====
        .route("/markets", get(list_markets))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/snapshot", get(get_snapshot))
        .route("/markets/:id/positions/:owner", get(get_position))
        .route("/markets/:id/journal", get(get_journal))
        // ===== DEVELOPMENT =====
        .route("/devnet/accounts", get(get_devnet_accounts))
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
