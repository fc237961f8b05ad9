use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use super::{degrade, elapsed_label, StatsAssembler};
use crate::analytics::buckets::{
    as_count, date_key, round_currency, DateBucketAggregator, DateWindow,
};
use crate::analytics::reports::{
    AgentWithStats, DailyStats, DashboardOverview, DashboardStats, RecentActivity, ReportMeta,
    VenueBreakdown,
};
use crate::domain::{
    agent_status, deployment_status, position_status, AgentRecord, AuditLogRecord,
    CanonicalAddress, Venue,
};
use crate::error::Result;
use crate::ledger::{Entity, LedgerFilter, Presence, SumField, TimeField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DailyMeasure {
    Signals,
    Positions,
    Pnl,
}

/// Overview counters, in the order the fetches are issued
fn overview_counts() -> Vec<(&'static str, Entity, LedgerFilter)> {
    vec![
        ("total_agents", Entity::Agents, LedgerFilter::all()),
        ("public_agents", Entity::Agents, LedgerFilter::all().status(agent_status::PUBLIC)),
        ("private_agents", Entity::Agents, LedgerFilter::all().status(agent_status::PRIVATE)),
        ("draft_agents", Entity::Agents, LedgerFilter::all().status(agent_status::DRAFT)),
        ("total_deployments", Entity::Deployments, LedgerFilter::all()),
        (
            "active_deployments",
            Entity::Deployments,
            LedgerFilter::all().status(deployment_status::ACTIVE),
        ),
        (
            "paused_deployments",
            Entity::Deployments,
            LedgerFilter::all().status(deployment_status::PAUSED),
        ),
        ("total_positions", Entity::Positions, LedgerFilter::all()),
        ("open_positions", Entity::Positions, LedgerFilter::all().status(position_status::OPEN)),
        (
            "closed_positions",
            Entity::Positions,
            LedgerFilter::all().require(Presence::ClosedAt),
        ),
        ("total_signals", Entity::Signals, LedgerFilter::all()),
        ("total_billing_events", Entity::BillingEvents, LedgerFilter::all()),
        ("total_telegram_users", Entity::TelegramUsers, LedgerFilter::all()),
        ("total_ct_accounts", Entity::CtAccounts, LedgerFilter::all()),
        ("total_research_institutes", Entity::ResearchInstitutes, LedgerFilter::all()),
    ]
}

impl StatsAssembler {
    /// Overview counters, per-agent breakdown, venue breakdown, a zero-filled
    /// daily series and recent audit activity.
    ///
    /// Every ledger query degrades on its own; this never fails.
    pub async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let started = Instant::now();
        let window = DateWindow::last_days(date_key(now), self.settings.window_days);
        let since = window.start_instant();

        let count_specs = overview_counts();
        let counts_fut = join_all(
            count_specs
                .iter()
                .map(|(label, entity, filter)| degrade(label, self.ledger.count(*entity, filter))),
        );
        let pnl_filter = LedgerFilter::all().require(Presence::Pnl);
        let signal_filter = LedgerFilter::all().since(TimeField::CreatedAt, since);
        let opened_filter = LedgerFilter::all().since(TimeField::OpenedAt, since);
        let closed_filter = LedgerFilter::all()
            .since(TimeField::ClosedAt, since)
            .require(Presence::Pnl);

        let (counts, total_pnl, agents, audit_logs, venue_breakdown, signals, opened, closed) = tokio::join!(
            counts_fut,
            degrade("total_pnl", self.ledger.sum(Entity::Positions, SumField::Pnl, &pnl_filter)),
            degrade("agents", self.ledger.list_agents()),
            degrade(
                "audit_logs",
                self.ledger.list_audit_logs(self.settings.recent_activity_limit)
            ),
            self.venue_breakdown(),
            degrade("daily_signals", self.ledger.list_signals(&signal_filter)),
            degrade("daily_opened_positions", self.ledger.list_positions(&opened_filter)),
            degrade("daily_closed_positions", self.ledger.list_positions(&closed_filter)),
        );

        let counts: HashMap<&str, i64> = count_specs
            .iter()
            .map(|(label, _, _)| *label)
            .zip(counts)
            .collect();
        let count = |label: &str| counts.get(label).copied().unwrap_or(0);
        let overview = DashboardOverview {
            total_agents: count("total_agents"),
            public_agents: count("public_agents"),
            private_agents: count("private_agents"),
            draft_agents: count("draft_agents"),
            total_deployments: count("total_deployments"),
            active_deployments: count("active_deployments"),
            paused_deployments: count("paused_deployments"),
            total_positions: count("total_positions"),
            open_positions: count("open_positions"),
            closed_positions: count("closed_positions"),
            total_signals: count("total_signals"),
            total_pnl: round_currency(total_pnl.unwrap_or(Decimal::ZERO)),
            total_billing_events: count("total_billing_events"),
            total_telegram_users: count("total_telegram_users"),
            total_ct_accounts: count("total_ct_accounts"),
            total_research_institutes: count("total_research_institutes"),
        };

        let receivers: Vec<&str> = agents
            .iter()
            .filter_map(|a| a.profit_receiver_address.as_deref())
            .collect();
        debug!(addresses = receivers.len(), "Fetching profit receiver balances");
        let balances = self.chain.native_balances(&receivers).await;
        let agents = agents
            .iter()
            .map(|agent| agent_with_stats(agent, &balances))
            .collect();

        let mut daily = DateBucketAggregator::windowed(window);
        for signal in &signals {
            daily.add(signal.created_at, DailyMeasure::Signals, Decimal::ONE);
        }
        for position in &opened {
            if let Some(opened_at) = position.opened_at {
                daily.add(opened_at, DailyMeasure::Positions, Decimal::ONE);
            }
        }
        for position in &closed {
            if let (Some(closed_at), Some(pnl)) = (position.closed_at, position.pnl) {
                daily.add(closed_at, DailyMeasure::Pnl, pnl);
            }
        }
        let daily_stats = daily
            .rollup()
            .iter()
            .map(|bucket| DailyStats {
                date: bucket.date_string(),
                signals: as_count(bucket.daily(&DailyMeasure::Signals)),
                positions: as_count(bucket.daily(&DailyMeasure::Positions)),
                pnl: round_currency(bucket.daily(&DailyMeasure::Pnl)),
            })
            .collect();

        let duration = elapsed_label(started);
        info!(duration_ms = started.elapsed().as_millis() as u64, "Dashboard stats assembled");

        Ok(DashboardStats {
            overview,
            agents,
            recent_activity: audit_logs.into_iter().map(recent_activity).collect(),
            venue_breakdown,
            daily_stats,
            meta: ReportMeta {
                duration,
                fetched_at: Utc::now(),
            },
        })
    }

    /// Three independent counts per venue, all in flight at once
    async fn venue_breakdown(&self) -> Vec<VenueBreakdown> {
        join_all(Venue::ALL.into_iter().map(|venue| async move {
            let filter = LedgerFilter::all().venue(venue);
            let (agent_count, deployment_count, position_count) = tokio::join!(
                degrade("venue_agents", self.ledger.count(Entity::Agents, &filter)),
                degrade("venue_deployments", self.ledger.count(Entity::Deployments, &filter)),
                degrade("venue_positions", self.ledger.count(Entity::Positions, &filter)),
            );
            VenueBreakdown {
                venue,
                agent_count,
                deployment_count,
                position_count,
            }
        }))
        .await
    }
}

fn agent_with_stats(agent: &AgentRecord, balances: &HashMap<CanonicalAddress, String>) -> AgentWithStats {
    let positions = agent.deployments.iter().flat_map(|d| d.positions.iter());
    let (total_positions, open_positions, total_pnl) =
        positions.fold((0i64, 0i64, Decimal::ZERO), |(total, open, pnl), p| {
            (
                total + 1,
                open + i64::from(p.status == position_status::OPEN),
                pnl + p.pnl.unwrap_or(Decimal::ZERO),
            )
        });

    let wallet_balance = agent
        .profit_receiver_address
        .as_deref()
        .and_then(|addr| balances.get(&CanonicalAddress::new(addr)))
        .cloned()
        .unwrap_or_else(|| "0".to_string());

    AgentWithStats {
        id: agent.id.clone(),
        name: agent.name.clone(),
        venue: agent.venue.clone(),
        creator_wallet: agent.creator_wallet.clone(),
        profit_receiver_address: agent.profit_receiver_address.clone(),
        status: agent.status.clone(),
        apr_30d: agent.apr_30d,
        apr_90d: agent.apr_90d,
        sharpe_30d: agent.sharpe_30d,
        subscriber_count: agent.deployments.len() as i64,
        active_subscribers: agent
            .deployments
            .iter()
            .filter(|d| d.status == deployment_status::ACTIVE)
            .count() as i64,
        total_positions,
        open_positions,
        total_signals: agent.signal_count,
        total_pnl: round_currency(total_pnl),
        wallet_balance,
    }
}

fn recent_activity(log: AuditLogRecord) -> RecentActivity {
    let subject = log.subject_type.as_deref().unwrap_or("system");
    RecentActivity {
        description: format!("{} on {}", log.event_name, subject),
        event_type: log.event_name,
        timestamp: log.occurred_at,
        metadata: log.payload,
    }
}
