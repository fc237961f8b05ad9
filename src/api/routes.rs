use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Admin analytics endpoints
        .route("/api/admin/dashboard-stats", get(handlers::get_dashboard_stats))
        .route("/api/admin/agent-analytics", get(handlers::get_agent_analytics))
        .route("/api/admin/wallet-balances", get(handlers::get_wallet_balances))
        .route("/api/admin/trading-volume", get(handlers::get_trading_volume))
        .route("/api/admin/onboarded-users", get(handlers::get_onboarded_users))
        // System endpoints
        .route("/health", get(handlers::health_handler))
        // Add state and CORS
        .with_state(state)
        .layer(cors)
}
