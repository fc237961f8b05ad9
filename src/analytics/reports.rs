//! JSON documents returned by the admin endpoints.
//!
//! Field names are camelCase because the dashboard front end consumes them
//! directly. Money is a [`Decimal`] already rounded to cents, serialized as
//! a fixed-precision string.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::Venue;

// ============================================================================
// Dashboard stats
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_agents: i64,
    pub public_agents: i64,
    pub private_agents: i64,
    pub draft_agents: i64,
    pub total_deployments: i64,
    pub active_deployments: i64,
    pub paused_deployments: i64,
    pub total_positions: i64,
    pub open_positions: i64,
    pub closed_positions: i64,
    pub total_signals: i64,
    pub total_pnl: Decimal,
    pub total_billing_events: i64,
    pub total_telegram_users: i64,
    pub total_ct_accounts: i64,
    pub total_research_institutes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentWithStats {
    pub id: String,
    pub name: String,
    pub venue: String,
    pub creator_wallet: String,
    pub profit_receiver_address: Option<String>,
    pub status: Option<String>,
    pub apr_30d: Option<f64>,
    pub apr_90d: Option<f64>,
    pub sharpe_30d: Option<f64>,
    pub subscriber_count: i64,
    pub active_subscribers: i64,
    pub total_positions: i64,
    pub open_positions: i64,
    pub total_signals: i64,
    pub total_pnl: Decimal,
    pub wallet_balance: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueBreakdown {
    pub venue: Venue,
    pub agent_count: i64,
    pub deployment_count: i64,
    pub position_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: String,
    pub signals: i64,
    pub positions: i64,
    pub pnl: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    #[serde(rename = "type")]
    pub event_type: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub duration: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: DashboardOverview,
    pub agents: Vec<AgentWithStats>,
    pub recent_activity: Vec<RecentActivity>,
    pub venue_breakdown: Vec<VenueBreakdown>,
    pub daily_stats: Vec<DailyStats>,
    pub meta: ReportMeta,
}

// ============================================================================
// Agent analytics
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAnalyticsPoint {
    pub date: String,
    pub new_deployments: i64,
    /// Running total of deployments, including those before the window
    pub deployments: i64,
    pub pnl: Decimal,
    #[serde(rename = "cumulativePnL")]
    pub cumulative_pnl: Decimal,
    pub signals: i64,
    pub signals_by_venue: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTopStats {
    pub total_subscribers: i64,
    pub active_subscribers: i64,
    pub total_signals_30d: i64,
    #[serde(rename = "netPnL30d")]
    pub net_pnl_30d: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAnalytics {
    pub daily: Vec<AgentAnalyticsPoint>,
    pub top_stats: AgentTopStats,
}

// ============================================================================
// Wallet balances
// ============================================================================

/// Why an address is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletRole {
    ProfitReceiver,
    SafeWallet,
    AgentAddress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalanceEntry {
    /// Address as stored in the ledger
    pub address: String,
    #[serde(rename = "type")]
    pub role: WalletRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_wallet: Option<String>,
    pub eth_balance: String,
    pub token_balances: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTotals {
    pub total_eth: Decimal,
    pub total_by_token: BTreeMap<String, Decimal>,
    pub wallet_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMeta {
    pub fetched_at: DateTime<Utc>,
    pub duration: String,
    pub address_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalancesReport {
    pub wallets: Vec<WalletBalanceEntry>,
    pub totals: WalletTotals,
    pub meta: WalletMeta,
}

// ============================================================================
// Trading volume
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingVolumePoint {
    pub date: String,
    pub mainnet_volume: Decimal,
    pub testnet_volume: Decimal,
    pub mainnet_trades: i64,
    pub testnet_trades: i64,
    pub cumulative_mainnet_volume: Decimal,
    pub cumulative_testnet_volume: Decimal,
    pub cumulative_mainnet_trades: i64,
    pub cumulative_testnet_trades: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingVolumeTotals {
    pub mainnet_volume: Decimal,
    pub testnet_volume: Decimal,
    pub mainnet_trades: i64,
    pub testnet_trades: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingVolumeReport {
    pub data: Vec<TradingVolumePoint>,
    pub totals: TradingVolumeTotals,
}

// ============================================================================
// Onboarded users
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardedUsersPoint {
    pub date: String,
    pub total: i64,
    pub hyperliquid: i64,
    pub ostium: i64,
    pub cumulative_total: i64,
    pub cumulative_hyperliquid: i64,
    pub cumulative_ostium: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardedUsersReport {
    pub data: Vec<OnboardedUsersPoint>,
    pub total_users: i64,
}
