use serde::{Deserialize, Serialize};

// ============================================================================
// Common Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: i64,
}

// ============================================================================
// Query Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradingVolumeQuery {
    /// Restrict the series to one trader's trades
    pub trader: Option<String>,
}
