use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use tracing::error;

use crate::analytics::{
    AgentAnalytics, DashboardStats, OnboardedUsersReport, TradingVolumeReport,
};
use crate::api::{
    state::AppState,
    types::{ErrorResponse, TradingVolumeQuery},
};
use crate::error::DashError;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Caller input errors are 400; anything else is a total assembly failure
fn api_error(endpoint: &str, err: DashError) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!(endpoint, error = %err, "Admin report failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// GET /api/admin/dashboard-stats
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
) -> std::result::Result<Json<DashboardStats>, ApiError> {
    state
        .assembler
        .dashboard_stats(Utc::now())
        .await
        .map(Json)
        .map_err(|e| api_error("dashboard-stats", e))
}

/// GET /api/admin/agent-analytics
pub async fn get_agent_analytics(
    State(state): State<AppState>,
) -> std::result::Result<Json<AgentAnalytics>, ApiError> {
    state
        .assembler
        .agent_analytics(Utc::now())
        .await
        .map(Json)
        .map_err(|e| api_error("agent-analytics", e))
}

/// GET /api/admin/wallet-balances
pub async fn get_wallet_balances(
    State(state): State<AppState>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let report = state
        .assembler
        .wallet_balances(Utc::now())
        .await
        .map_err(|e| api_error("wallet-balances", e))?;

    Ok(([(header::CACHE_CONTROL, "private, max-age=30")], Json(report)))
}

/// GET /api/admin/trading-volume?trader=0x...
pub async fn get_trading_volume(
    State(state): State<AppState>,
    Query(query): Query<TradingVolumeQuery>,
) -> std::result::Result<Json<TradingVolumeReport>, ApiError> {
    let trader = query
        .trader
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let report = match trader {
        Some(trader) => state.assembler.trader_volume(trader).await,
        None => state.assembler.trading_volume().await,
    };
    report.map(Json).map_err(|e| api_error("trading-volume", e))
}

/// GET /api/admin/onboarded-users
pub async fn get_onboarded_users(
    State(state): State<AppState>,
) -> std::result::Result<Json<OnboardedUsersReport>, ApiError> {
    state
        .assembler
        .onboarded_users()
        .await
        .map(Json)
        .map_err(|e| api_error("onboarded-users", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let (status, body) = api_error("trading-volume", DashError::AddressParsing("0x12".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("0x12"));

        let (status, _) = api_error("onboarded-users", DashError::Internal("boom".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
