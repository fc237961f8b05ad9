//! Request-scoped orchestration of ledger, chain and trade-index reads.
//!
//! One method per admin endpoint. Each call fans its independent queries
//! out concurrently and joins them before shaping a response document.
//! Nothing is cached between calls.

mod agent_growth;
mod dashboard;
mod onboarding;
mod trading_volume;
mod wallets;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use super::balances::ChainBatchReader;
use super::volume::TradeIndex;
use crate::config::AnalyticsConfig;
use crate::domain::TokenConfig;
use crate::error::Result;
use crate::ledger::Ledger;

/// Tunables of the assembled reports
#[derive(Debug, Clone)]
pub struct AssemblerSettings {
    /// Days covered by the trailing analytics windows
    pub window_days: u32,
    /// Audit log rows in the dashboard's recent activity
    pub recent_activity_limit: i64,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            recent_activity_limit: 20,
        }
    }
}

impl From<&AnalyticsConfig> for AssemblerSettings {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            window_days: config.window_days,
            recent_activity_limit: config.recent_activity_limit,
        }
    }
}

/// Builds the admin analytics documents
#[derive(Clone)]
pub struct StatsAssembler {
    ledger: Arc<dyn Ledger>,
    chain: ChainBatchReader,
    trades: Arc<dyn TradeIndex>,
    tokens: Vec<TokenConfig>,
    settings: AssemblerSettings,
}

impl StatsAssembler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        chain: ChainBatchReader,
        trades: Arc<dyn TradeIndex>,
        tokens: Vec<TokenConfig>,
        settings: AssemblerSettings,
    ) -> Self {
        Self {
            ledger,
            chain,
            trades,
            tokens,
            settings,
        }
    }

    pub fn settings(&self) -> &AssemblerSettings {
        &self.settings
    }
}

/// Await a guarded sub-fetch, replacing a failure with the neutral default
async fn degrade<T, F>(label: &str, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            warn!(query = label, error = %e, "Ledger query failed, using default");
            T::default()
        }
    }
}

/// `"<n>ms"` since `started`
fn elapsed_label(started: Instant) -> String {
    format!("{}ms", started.elapsed().as_millis())
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory collaborators shared by the assembler tests.

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use alloy::primitives::address;

    use super::{AssemblerSettings, StatsAssembler};
    use crate::analytics::balances::{BatchCaller, CallDescriptor, CallOutcome, ChainBatchReader};
    use crate::analytics::volume::{SubgraphTrade, TradeIndex};
    use crate::domain::*;
    use crate::error::{DashError, Result};
    use crate::ledger::{Entity, Ledger, LedgerFilter, Presence, SumField, TimeField};

    /// Ledger over plain vectors; `failing` entities return an error
    #[derive(Default)]
    pub struct MemoryLedger {
        pub agents: Vec<AgentRecord>,
        pub deployments: Vec<DeploymentRecord>,
        pub positions: Vec<PositionRecord>,
        pub signals: Vec<SignalRecord>,
        pub user_agent_addresses: Vec<UserAgentAddressRecord>,
        pub audit_logs: Vec<AuditLogRecord>,
        pub fixed_counts: HashMap<&'static str, i64>,
        pub failing: Vec<Entity>,
    }

    impl MemoryLedger {
        fn check(&self, entity: Entity) -> Result<()> {
            if self.failing.contains(&entity) {
                Err(DashError::Internal(format!("{} unavailable", entity.as_str())))
            } else {
                Ok(())
            }
        }

        fn agent_venue(&self, agent_id: &str) -> Option<Venue> {
            self.agents
                .iter()
                .find(|a| a.id == agent_id)
                .and_then(|a| Venue::try_from(a.venue.as_str()).ok())
        }

        fn deployment_matches(&self, d: &DeploymentRecord, f: &LedgerFilter) -> bool {
            f.status.as_ref().map_or(true, |s| &d.status == s)
                && f.venue.map_or(true, |v| self.agent_venue(&d.agent_id) == Some(v))
                && f.range.map_or(true, |r| {
                    r.field == TimeField::SubscriptionStartedAt
                        && d.sub_started_at.is_some_and(|t| r.contains(t))
                })
                && (!f.requires(Presence::SafeWallet)
                    || d.safe_wallet.as_deref().is_some_and(|s| !s.is_empty()))
        }

        fn position_matches(p: &PositionRecord, f: &LedgerFilter) -> bool {
            let at = |field| match field {
                TimeField::OpenedAt => p.opened_at,
                TimeField::ClosedAt => p.closed_at,
                _ => None,
            };
            f.status.as_ref().map_or(true, |s| &p.status == s)
                && f.venue.map_or(true, |v| p.venue.as_deref() == Some(v.as_str()))
                && f.range.map_or(true, |r| at(r.field).is_some_and(|t| r.contains(t)))
                && (!f.requires(Presence::ClosedAt) || p.closed_at.is_some())
                && (!f.requires(Presence::Pnl) || p.pnl.is_some())
                && (!f.requires(Presence::TradeId) || p.trade_id.is_some())
        }

        fn signal_matches(s: &SignalRecord, f: &LedgerFilter) -> bool {
            f.venue.map_or(true, |v| s.venue.as_deref() == Some(v.as_str()))
                && f.range.map_or(true, |r| r.field == TimeField::CreatedAt && r.contains(s.created_at))
        }
    }

    #[async_trait]
    impl Ledger for MemoryLedger {
        async fn count(&self, entity: Entity, filter: &LedgerFilter) -> Result<i64> {
            self.check(entity)?;
            let n = match entity {
                Entity::Agents => self
                    .agents
                    .iter()
                    .filter(|a| filter.status.as_ref().map_or(true, |s| a.status.as_ref() == Some(s)))
                    .filter(|a| filter.venue.map_or(true, |v| a.venue == v.as_str()))
                    .count(),
                Entity::Deployments => self
                    .deployments
                    .iter()
                    .filter(|d| self.deployment_matches(d, filter))
                    .count(),
                Entity::Positions => self
                    .positions
                    .iter()
                    .filter(|p| Self::position_matches(p, filter))
                    .count(),
                Entity::Signals => self
                    .signals
                    .iter()
                    .filter(|s| Self::signal_matches(s, filter))
                    .count(),
                other => return Ok(self.fixed_counts.get(other.as_str()).copied().unwrap_or(0)),
            };
            Ok(n as i64)
        }

        async fn sum(&self, entity: Entity, _field: SumField, filter: &LedgerFilter) -> Result<Option<Decimal>> {
            self.check(entity)?;
            let values: Vec<Decimal> = self
                .positions
                .iter()
                .filter(|p| Self::position_matches(p, filter))
                .filter_map(|p| p.pnl)
                .collect();
            Ok((!values.is_empty()).then(|| values.into_iter().sum()))
        }

        async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
            self.check(Entity::Agents)?;
            Ok(self.agents.clone())
        }

        async fn list_deployments(&self, filter: &LedgerFilter) -> Result<Vec<DeploymentRecord>> {
            self.check(Entity::Deployments)?;
            Ok(self
                .deployments
                .iter()
                .filter(|d| self.deployment_matches(d, filter))
                .cloned()
                .collect())
        }

        async fn list_positions(&self, filter: &LedgerFilter) -> Result<Vec<PositionRecord>> {
            self.check(Entity::Positions)?;
            Ok(self
                .positions
                .iter()
                .filter(|p| Self::position_matches(p, filter))
                .cloned()
                .collect())
        }

        async fn list_signals(&self, filter: &LedgerFilter) -> Result<Vec<SignalRecord>> {
            self.check(Entity::Signals)?;
            Ok(self
                .signals
                .iter()
                .filter(|s| Self::signal_matches(s, filter))
                .cloned()
                .collect())
        }

        async fn list_user_agent_addresses(&self) -> Result<Vec<UserAgentAddressRecord>> {
            self.check(Entity::UserAgentAddresses)?;
            Ok(self.user_agent_addresses.clone())
        }

        async fn list_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogRecord>> {
            self.check(Entity::AuditLogs)?;
            Ok(self.audit_logs.iter().take(limit as usize).cloned().collect())
        }
    }

    /// Answers every call with the same balance word and counts submissions
    #[derive(Default)]
    pub struct FixedBalanceCaller {
        pub balance: u128,
        pub submissions: AtomicUsize,
    }

    #[async_trait]
    impl BatchCaller for FixedBalanceCaller {
        async fn aggregate3(&self, calls: Vec<CallDescriptor>) -> Result<Vec<CallOutcome>> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            let word = alloy::primitives::U256::from(self.balance).to_be_bytes::<32>().to_vec();
            Ok(calls.iter().map(|_| CallOutcome::Ok(word.clone().into())).collect())
        }
    }

    /// Trade index keyed by network
    #[derive(Default)]
    pub struct MemoryTradeIndex {
        pub trades: HashMap<Network, Vec<SubgraphTrade>>,
        pub traders: HashMap<(Network, String), Vec<SubgraphTrade>>,
    }

    #[async_trait]
    impl TradeIndex for MemoryTradeIndex {
        async fn trades_by_ids(&self, network: Network, trade_ids: &[String]) -> HashMap<String, SubgraphTrade> {
            self.trades
                .get(&network)
                .into_iter()
                .flatten()
                .filter(|t| trade_ids.contains(&t.trade_id))
                .map(|t| (t.trade_id.clone(), t.clone()))
                .collect()
        }

        async fn trades_by_trader(&self, network: Network, trader: &CanonicalAddress) -> Vec<SubgraphTrade> {
            self.traders
                .get(&(network, trader.as_str().to_string()))
                .cloned()
                .unwrap_or_default()
        }
    }

    pub fn trade(trade_id: &str, notional: &str, timestamp: i64) -> SubgraphTrade {
        SubgraphTrade {
            id: format!("0x{trade_id}"),
            trade_id: trade_id.to_string(),
            trade_notional: None,
            notional: Some(notional.to_string()),
            timestamp: timestamp.to_string(),
            is_open: false,
        }
    }

    pub fn assembler(ledger: MemoryLedger, caller: Arc<FixedBalanceCaller>, trades: MemoryTradeIndex) -> StatsAssembler {
        let chain = ChainBatchReader::new(
            caller,
            address!("cA11bde05977b3631167028862bE2a173976CA11"),
            500,
        );
        StatsAssembler::new(
            Arc::new(ledger),
            chain,
            Arc::new(trades),
            default_tokens(),
            AssemblerSettings::default(),
        )
    }
}
