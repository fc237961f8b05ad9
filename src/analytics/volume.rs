//! Trade notional normalization and the external trade index seam.
//!
//! The trade index reports two notional fields as fixed-point integer
//! strings. `notional` (position size) carries 6 implied decimals;
//! `tradeNotional` is populated at a different lifecycle stage and carries
//! 12. They must never share a divisor.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::{CanonicalAddress, Network};

/// Implied decimals of the position-size notional
pub const PRIMARY_NOTIONAL_DECIMALS: u32 = 6;
/// Implied decimals of the trade-level notional
pub const SECONDARY_NOTIONAL_DECIMALS: u32 = 12;

/// Lenient numeric parse; `None` for anything that is not a finite number
fn parse_number(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .and_then(Decimal::from_f64)
        })
}

fn scaled(value: Decimal, decimals: u32) -> Decimal {
    value / Decimal::from_i128_with_scale(10_i128.pow(decimals), 0)
}

/// USD volume of a trade.
///
/// Uses `primary / 1e6` when `primary` is a positive number, otherwise
/// `secondary / 1e12` when that is positive, otherwise zero. Unparseable
/// input counts as non-positive.
pub fn normalize_notional(primary: &str, secondary: Option<&str>) -> Decimal {
    if let Some(value) = parse_number(primary).filter(|v| *v > Decimal::ZERO) {
        return scaled(value, PRIMARY_NOTIONAL_DECIMALS);
    }
    if let Some(value) = secondary
        .and_then(parse_number)
        .filter(|v| *v > Decimal::ZERO)
    {
        return scaled(value, SECONDARY_NOTIONAL_DECIMALS);
    }
    Decimal::ZERO
}

/// A trade as reported by the external trade index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphTrade {
    pub id: String,
    #[serde(rename = "tradeID")]
    pub trade_id: String,
    #[serde(rename = "tradeNotional", default)]
    pub trade_notional: Option<String>,
    #[serde(default)]
    pub notional: Option<String>,
    /// Unix seconds
    pub timestamp: String,
    #[serde(rename = "isOpen", default)]
    pub is_open: bool,
}

impl SubgraphTrade {
    pub fn volume_usd(&self) -> Decimal {
        normalize_notional(
            self.notional.as_deref().unwrap_or("0"),
            self.trade_notional.as_deref(),
        )
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.timestamp.trim().parse::<i64>().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

/// Lookup of trades in the external index.
///
/// Both operations are infallible from the caller's side: a failed request
/// drops only the chunk or wallet it covered.
#[async_trait]
pub trait TradeIndex: Send + Sync {
    /// Trades keyed by `tradeID`; ids that were not found are absent
    async fn trades_by_ids(
        &self,
        network: Network,
        trade_ids: &[String],
    ) -> HashMap<String, SubgraphTrade>;

    /// Every trade of one trader, oldest first
    async fn trades_by_trader(
        &self,
        network: Network,
        trader: &CanonicalAddress,
    ) -> Vec<SubgraphTrade>;
}
