use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use super::StatsAssembler;
use crate::analytics::buckets::{as_count, DateBucketAggregator, TimestampedRecord};
use crate::analytics::reports::{OnboardedUsersPoint, OnboardedUsersReport};
use crate::domain::UserAgentAddressRecord;
use crate::error::Result;

/// Per-day onboarding counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Measure {
    Total,
    Hyperliquid,
    Ostium,
}

fn has_address(address: &Option<String>) -> bool {
    address.as_deref().is_some_and(|a| !a.trim().is_empty())
}

impl TimestampedRecord for &UserAgentAddressRecord {
    type Measure = Measure;

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn measures(&self) -> Vec<(Measure, Decimal)> {
        let mut out = vec![(Measure::Total, Decimal::ONE)];
        if has_address(&self.hyperliquid_agent_address) {
            out.push((Measure::Hyperliquid, Decimal::ONE));
        }
        if has_address(&self.ostium_agent_address) {
            out.push((Measure::Ostium, Decimal::ONE));
        }
        out
    }
}

impl StatsAssembler {
    /// Users onboarded per day, by venue, over every observed date
    pub async fn onboarded_users(&self) -> Result<OnboardedUsersReport> {
        let records = self.ledger.list_user_agent_addresses().await?;

        let mut agg = DateBucketAggregator::sparse();
        agg.ingest(records.iter());
        let series = agg.rollup();

        let data: Vec<OnboardedUsersPoint> = series
            .iter()
            .map(|bucket| OnboardedUsersPoint {
                date: bucket.date_string(),
                total: as_count(bucket.daily(&Measure::Total)),
                hyperliquid: as_count(bucket.daily(&Measure::Hyperliquid)),
                ostium: as_count(bucket.daily(&Measure::Ostium)),
                cumulative_total: as_count(bucket.cumulative(&Measure::Total)),
                cumulative_hyperliquid: as_count(bucket.cumulative(&Measure::Hyperliquid)),
                cumulative_ostium: as_count(bucket.cumulative(&Measure::Ostium)),
            })
            .collect();

        info!(users = records.len(), days = data.len(), "Onboarded users assembled");
        Ok(OnboardedUsersReport {
            data,
            total_users: records.len() as i64,
        })
    }
}
