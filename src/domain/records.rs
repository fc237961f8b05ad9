//! Rows read from the platform ledger.
//!
//! These are read-only projections: the admin service never writes them back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An agent with its deployments and their positions, loaded in one bulk fetch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub venue: String,
    pub creator_wallet: String,
    pub profit_receiver_address: Option<String>,
    pub status: Option<String>,
    pub apr_30d: Option<f64>,
    pub apr_90d: Option<f64>,
    pub sharpe_30d: Option<f64>,
    pub deployments: Vec<DeploymentSummary>,
    pub signal_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub id: String,
    pub status: String,
    pub positions: Vec<PositionSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionSummary {
    pub status: String,
    pub pnl: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    pub agent_id: String,
    pub user_wallet: String,
    pub safe_wallet: Option<String>,
    pub status: String,
    pub sub_started_at: Option<DateTime<Utc>>,
    pub is_testnet: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: String,
    pub deployment_id: String,
    pub venue: Option<String>,
    pub status: String,
    pub pnl: Option<Decimal>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Identifier of the trade in the external trade index
    pub trade_id: Option<String>,
    /// Testnet flag of the owning deployment
    pub is_testnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: String,
    pub agent_id: String,
    pub venue: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAgentAddressRecord {
    pub user_wallet: String,
    pub hyperliquid_agent_address: Option<String>,
    pub ostium_agent_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogRecord {
    pub event_name: String,
    pub subject_type: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}
