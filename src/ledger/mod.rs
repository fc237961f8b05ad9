//! Ledger query interface
//!
//! The analytics core reads the platform database only through [`Ledger`].
//! Filters are built from closed enums so an implementation can map every
//! table and column name from a whitelist and bind all values.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    AgentRecord, AuditLogRecord, DeploymentRecord, PositionRecord, SignalRecord,
    UserAgentAddressRecord, Venue,
};
use crate::error::Result;

/// Countable ledger entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Agents,
    Deployments,
    Positions,
    Signals,
    BillingEvents,
    TelegramUsers,
    CtAccounts,
    ResearchInstitutes,
    UserAgentAddresses,
    AuditLogs,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Agents => "agents",
            Entity::Deployments => "deployments",
            Entity::Positions => "positions",
            Entity::Signals => "signals",
            Entity::BillingEvents => "billing_events",
            Entity::TelegramUsers => "telegram_users",
            Entity::CtAccounts => "ct_accounts",
            Entity::ResearchInstitutes => "research_institutes",
            Entity::UserAgentAddresses => "user_agent_addresses",
            Entity::AuditLogs => "audit_logs",
        }
    }
}

/// Timestamp columns a range filter can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeField {
    CreatedAt,
    OpenedAt,
    ClosedAt,
    SubscriptionStartedAt,
    OccurredAt,
}

/// Nullable fields a filter can require to be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    ClosedAt,
    Pnl,
    TradeId,
    SafeWallet,
}

/// Summable numeric fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SumField {
    Pnl,
}

/// Half-open time range `[since, until)` on one timestamp column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub field: TimeField,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since.map_or(true, |s| at >= s) && self.until.map_or(true, |u| at < u)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub status: Option<String>,
    pub venue: Option<Venue>,
    pub range: Option<TimeRange>,
    pub require: Vec<Presence>,
}

impl LedgerFilter {
    /// Matches every row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue);
        self
    }

    pub fn since(mut self, field: TimeField, since: DateTime<Utc>) -> Self {
        let until = self.range.filter(|r| r.field == field).and_then(|r| r.until);
        self.range = Some(TimeRange {
            field,
            since: Some(since),
            until,
        });
        self
    }

    pub fn before(mut self, field: TimeField, until: DateTime<Utc>) -> Self {
        let since = self.range.filter(|r| r.field == field).and_then(|r| r.since);
        self.range = Some(TimeRange {
            field,
            since,
            until: Some(until),
        });
        self
    }

    pub fn require(mut self, presence: Presence) -> Self {
        if !self.require.contains(&presence) {
            self.require.push(presence);
        }
        self
    }

    pub fn requires(&self, presence: Presence) -> bool {
        self.require.contains(&presence)
    }
}

/// Read-only access to the platform ledger.
///
/// Implementations must tolerate many calls per request; callers issue
/// them concurrently and degrade each failure on their own.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Number of rows of `entity` matching `filter`
    async fn count(&self, entity: Entity, filter: &LedgerFilter) -> Result<i64>;

    /// Sum of `field` over matching rows, `None` when no row has a value
    async fn sum(&self, entity: Entity, field: SumField, filter: &LedgerFilter)
        -> Result<Option<Decimal>>;

    /// Agents with nested deployments and positions, by `apr_30d` desc (nulls last)
    async fn list_agents(&self) -> Result<Vec<AgentRecord>>;

    /// Deployments by subscription start, oldest first
    async fn list_deployments(&self, filter: &LedgerFilter) -> Result<Vec<DeploymentRecord>>;

    /// Positions by open time, oldest first
    async fn list_positions(&self, filter: &LedgerFilter) -> Result<Vec<PositionRecord>>;

    /// Signals by creation time, oldest first
    async fn list_signals(&self, filter: &LedgerFilter) -> Result<Vec<SignalRecord>>;

    /// Per-user agent addresses by creation time, oldest first
    async fn list_user_agent_addresses(&self) -> Result<Vec<UserAgentAddressRecord>>;

    /// Most recent audit log rows, newest first
    async fn list_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogRecord>>;
}
