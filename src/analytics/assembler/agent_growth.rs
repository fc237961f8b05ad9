use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use super::{degrade, StatsAssembler};
use crate::analytics::buckets::{
    as_count, date_key, round_currency, DateBucketAggregator, DateWindow,
};
use crate::analytics::reports::{AgentAnalytics, AgentAnalyticsPoint, AgentTopStats};
use crate::domain::deployment_status;
use crate::error::Result;
use crate::ledger::{Entity, LedgerFilter, Presence, SumField, TimeField};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Measure {
    Deployments,
    Pnl,
    Signals,
    VenueSignals(String),
}

impl StatsAssembler {
    /// Deployment growth, closed-position PnL and signal volume over the
    /// trailing window ending today, with the deployment series seeded by
    /// everything subscribed before the window.
    pub async fn agent_analytics(&self, now: DateTime<Utc>) -> Result<AgentAnalytics> {
        let started = Instant::now();
        let window = DateWindow::trailing(date_key(now), self.settings.window_days);
        let since = window.start_instant();

        let deployments_filter = LedgerFilter::all().since(TimeField::SubscriptionStartedAt, since);
        let prior_filter = LedgerFilter::all().before(TimeField::SubscriptionStartedAt, since);
        let closed_filter = LedgerFilter::all()
            .since(TimeField::ClosedAt, since)
            .require(Presence::Pnl);
        let signals_filter = LedgerFilter::all().since(TimeField::CreatedAt, since);
        let active_filter = LedgerFilter::all().status(deployment_status::ACTIVE);
        let all = LedgerFilter::all();

        let (deployments, prior, closed, signals, total_subscribers, active_subscribers, net_pnl) = tokio::join!(
            degrade("window_deployments", self.ledger.list_deployments(&deployments_filter)),
            degrade("prior_deployments", self.ledger.count(Entity::Deployments, &prior_filter)),
            degrade("window_closed_positions", self.ledger.list_positions(&closed_filter)),
            degrade("window_signals", self.ledger.list_signals(&signals_filter)),
            degrade("total_subscribers", self.ledger.count(Entity::Deployments, &all)),
            degrade("active_subscribers", self.ledger.count(Entity::Deployments, &active_filter)),
            degrade(
                "net_pnl",
                self.ledger.sum(Entity::Positions, SumField::Pnl, &closed_filter)
            ),
        );

        let mut agg = DateBucketAggregator::windowed(window)
            .with_offset(Measure::Deployments, Decimal::from(prior));
        for deployment in &deployments {
            if let Some(at) = deployment.sub_started_at {
                agg.add(at, Measure::Deployments, Decimal::ONE);
            }
        }
        for position in &closed {
            if let (Some(at), Some(pnl)) = (position.closed_at, position.pnl) {
                agg.add(at, Measure::Pnl, pnl);
            }
        }
        let mut window_signals = 0i64;
        for signal in &signals {
            if agg.add(signal.created_at, Measure::Signals, Decimal::ONE) {
                window_signals += 1;
                if let Some(venue) = &signal.venue {
                    agg.add(signal.created_at, Measure::VenueSignals(venue.clone()), Decimal::ONE);
                }
            }
        }

        let daily = agg
            .rollup()
            .iter()
            .map(|bucket| AgentAnalyticsPoint {
                date: bucket.date_string(),
                new_deployments: as_count(bucket.daily(&Measure::Deployments)),
                deployments: as_count(bucket.cumulative(&Measure::Deployments)),
                pnl: round_currency(bucket.daily(&Measure::Pnl)),
                cumulative_pnl: round_currency(bucket.cumulative(&Measure::Pnl)),
                signals: as_count(bucket.daily(&Measure::Signals)),
                signals_by_venue: bucket
                    .daily
                    .iter()
                    .filter_map(|(key, value)| match key {
                        Measure::VenueSignals(venue) => Some((venue.clone(), as_count(*value))),
                        _ => None,
                    })
                    .collect::<BTreeMap<_, _>>(),
            })
            .collect();

        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            prior_deployments = prior,
            "Agent analytics assembled"
        );

        Ok(AgentAnalytics {
            daily,
            top_stats: AgentTopStats {
                total_subscribers,
                active_subscribers,
                total_signals_30d: window_signals,
                net_pnl_30d: round_currency(net_pnl.unwrap_or(Decimal::ZERO)).to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::domain::{DeploymentRecord, PositionRecord, SignalRecord};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 12, 0, 0).unwrap()
    }

    fn deployment(id: &str, started: DateTime<Utc>, status: &str) -> DeploymentRecord {
        DeploymentRecord {
            id: id.to_string(),
            agent_id: "a1".to_string(),
            status: status.to_string(),
            sub_started_at: Some(started),
            ..Default::default()
        }
    }

    fn signal(id: &str, venue: &str, created_at: DateTime<Utc>) -> SignalRecord {
        SignalRecord {
            id: id.to_string(),
            agent_id: "a1".to_string(),
            venue: Some(venue.to_string()),
            created_at,
        }
    }

    fn ledger() -> MemoryLedger {
        MemoryLedger {
            deployments: vec![
                deployment("old1", at(1, 5), "ACTIVE"),
                deployment("old2", at(1, 20), "PAUSED"),
                deployment("new1", at(3, 10), "ACTIVE"),
                deployment("new2", at(3, 10), "ACTIVE"),
            ],
            positions: vec![
                PositionRecord {
                    id: "p1".to_string(),
                    status: "CLOSED".to_string(),
                    pnl: Some(dec!(10)),
                    closed_at: Some(at(3, 1)),
                    ..Default::default()
                },
                PositionRecord {
                    id: "p2".to_string(),
                    status: "CLOSED".to_string(),
                    pnl: Some(dec!(-2.505)),
                    closed_at: Some(at(3, 31)),
                    ..Default::default()
                },
            ],
            signals: vec![
                signal("s1", "OSTIUM", at(3, 10)),
                signal("s2", "HYPERLIQUID", at(3, 10)),
                signal("s3", "OSTIUM", at(3, 10)),
                signal("s0", "OSTIUM", at(2, 1)),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_window_has_thirty_one_dates_seeded_by_prior_deployments() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap();
        let report = assembler(ledger(), Arc::new(FixedBalanceCaller::default()), MemoryTradeIndex::default())
            .agent_analytics(now)
            .await
            .unwrap();

        assert_eq!(report.daily.len(), 31);
        assert_eq!(report.daily[0].date, "2024-03-01");
        assert_eq!(report.daily[30].date, "2024-03-31");

        // two deployments predate the window
        assert_eq!(report.daily[0].deployments, 2);
        let march_10 = &report.daily[9];
        assert_eq!(march_10.new_deployments, 2);
        assert_eq!(march_10.deployments, 4);
        assert_eq!(report.daily[30].deployments, 4);

        assert_eq!(march_10.signals, 3);
        assert_eq!(march_10.signals_by_venue.get("OSTIUM"), Some(&2));
        assert_eq!(march_10.signals_by_venue.get("HYPERLIQUID"), Some(&1));
        assert!(report.daily[0].signals_by_venue.is_empty());

        assert_eq!(report.daily[0].pnl, dec!(10.00));
        assert_eq!(report.daily[30].pnl, dec!(-2.51));
        assert_eq!(report.daily[30].cumulative_pnl, dec!(7.50));

        assert_eq!(report.top_stats.total_subscribers, 4);
        assert_eq!(report.top_stats.active_subscribers, 3);
        assert_eq!(report.top_stats.total_signals_30d, 3);
        assert_eq!(report.top_stats.net_pnl_30d, "7.50");
    }

    #[tokio::test]
    async fn test_json_field_names() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let report = assembler(ledger(), Arc::new(FixedBalanceCaller::default()), MemoryTradeIndex::default())
            .agent_analytics(now)
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["daily"][0].get("cumulativePnL").is_some());
        assert!(json["daily"][0].get("signalsByVenue").is_some());
        assert_eq!(json["topStats"]["netPnL30d"], "7.50");
        assert_eq!(json["topStats"]["totalSignals30d"], 3);
    }

    #[tokio::test]
    async fn test_failing_ledger_yields_zeroed_window() {
        let ledger = MemoryLedger {
            failing: vec![Entity::Deployments, Entity::Positions, Entity::Signals],
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let report = assembler(ledger, Arc::new(FixedBalanceCaller::default()), MemoryTradeIndex::default())
            .agent_analytics(now)
            .await
            .unwrap();

        assert_eq!(report.daily.len(), 31);
        assert!(report.daily.iter().all(|p| p.deployments == 0 && p.signals == 0));
        assert_eq!(report.top_stats.net_pnl_30d, "0.00");
    }
}
