use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use super::StatsAssembler;
use crate::analytics::buckets::{as_count, round_currency, AggregateSeries, DateBucketAggregator};
use crate::analytics::reports::{TradingVolumePoint, TradingVolumeReport, TradingVolumeTotals};
use crate::analytics::volume::SubgraphTrade;
use crate::domain::{parse_address, CanonicalAddress, Network, PositionRecord};
use crate::error::Result;
use crate::ledger::{LedgerFilter, Presence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Measure {
    Volume(Network),
    Trades(Network),
}

fn network_of(position: &PositionRecord) -> Network {
    if position.is_testnet {
        Network::Testnet
    } else {
        Network::Mainnet
    }
}

fn log_samples(network: Network, trades: &HashMap<String, SubgraphTrade>) {
    for trade in trades.values().take(3) {
        debug!(
            %network,
            trade_id = %trade.trade_id,
            notional = ?trade.notional,
            trade_notional = ?trade.trade_notional,
            parsed = %round_currency(trade.volume_usd()),
            "Sample trade"
        );
    }
}

fn to_report(series: AggregateSeries<Measure>) -> TradingVolumeReport {
    use Network::{Mainnet, Testnet};

    let data = series
        .iter()
        .map(|bucket| TradingVolumePoint {
            date: bucket.date_string(),
            mainnet_volume: round_currency(bucket.daily(&Measure::Volume(Mainnet))),
            testnet_volume: round_currency(bucket.daily(&Measure::Volume(Testnet))),
            mainnet_trades: as_count(bucket.daily(&Measure::Trades(Mainnet))),
            testnet_trades: as_count(bucket.daily(&Measure::Trades(Testnet))),
            cumulative_mainnet_volume: round_currency(bucket.cumulative(&Measure::Volume(Mainnet))),
            cumulative_testnet_volume: round_currency(bucket.cumulative(&Measure::Volume(Testnet))),
            cumulative_mainnet_trades: as_count(bucket.cumulative(&Measure::Trades(Mainnet))),
            cumulative_testnet_trades: as_count(bucket.cumulative(&Measure::Trades(Testnet))),
        })
        .collect();

    TradingVolumeReport {
        data,
        totals: TradingVolumeTotals {
            mainnet_volume: round_currency(series.total(&Measure::Volume(Mainnet))),
            testnet_volume: round_currency(series.total(&Measure::Volume(Testnet))),
            mainnet_trades: as_count(series.total(&Measure::Trades(Mainnet))),
            testnet_trades: as_count(series.total(&Measure::Trades(Testnet))),
        },
    }
}

impl StatsAssembler {
    /// Platform trading volume over every observed date.
    ///
    /// Each position with an external trade id counts as one trade on its
    /// open date and adds its trade's notional when the index knows it.
    pub async fn trading_volume(&self) -> Result<TradingVolumeReport> {
        let started = Instant::now();
        let filter = LedgerFilter::all().require(Presence::TradeId);
        let positions = self.ledger.list_positions(&filter).await?;

        let (testnet, mainnet): (Vec<&PositionRecord>, Vec<&PositionRecord>) =
            positions.iter().partition(|p| p.is_testnet);
        let ids = |list: &[&PositionRecord]| -> Vec<String> {
            list.iter().filter_map(|p| p.trade_id.clone()).collect()
        };
        let (mainnet_ids, testnet_ids) = (ids(mainnet.as_slice()), ids(testnet.as_slice()));
        info!(
            mainnet = mainnet_ids.len(),
            testnet = testnet_ids.len(),
            "Fetching trades from the trade index"
        );

        let (mainnet_trades, testnet_trades) = tokio::join!(
            self.trades.trades_by_ids(Network::Mainnet, &mainnet_ids),
            self.trades.trades_by_ids(Network::Testnet, &testnet_ids),
        );
        info!(
            mainnet = mainnet_trades.len(),
            testnet = testnet_trades.len(),
            "Retrieved trades from the trade index"
        );
        log_samples(Network::Mainnet, &mainnet_trades);
        log_samples(Network::Testnet, &testnet_trades);

        let mut agg = DateBucketAggregator::sparse();
        for position in &positions {
            let (Some(opened_at), Some(trade_id)) = (position.opened_at, &position.trade_id) else {
                continue;
            };
            let network = network_of(position);
            let found = match network {
                Network::Mainnet => mainnet_trades.get(trade_id),
                Network::Testnet => testnet_trades.get(trade_id),
            };
            agg.add(opened_at, Measure::Trades(network), Decimal::ONE);
            let volume = found.map(SubgraphTrade::volume_usd).unwrap_or(Decimal::ZERO);
            agg.add(opened_at, Measure::Volume(network), volume);
        }

        let report = to_report(agg.rollup());
        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            days = report.data.len(),
            "Trading volume assembled"
        );
        Ok(report)
    }

    /// Volume of one trader, bucketed by the index's own trade timestamps
    pub async fn trader_volume(&self, trader: &str) -> Result<TradingVolumeReport> {
        parse_address(trader)?;
        let trader = CanonicalAddress::new(trader);

        let (mainnet, testnet) = tokio::join!(
            self.trades.trades_by_trader(Network::Mainnet, &trader),
            self.trades.trades_by_trader(Network::Testnet, &trader),
        );
        debug!(%trader, mainnet = mainnet.len(), testnet = testnet.len(), "Trader trades fetched");

        let mut agg = DateBucketAggregator::sparse();
        for (network, trades) in [(Network::Mainnet, &mainnet), (Network::Testnet, &testnet)] {
            for trade in trades {
                let Some(at) = trade.executed_at() else {
                    continue;
                };
                agg.add(at, Measure::Trades(network), Decimal::ONE);
                agg.add(at, Measure::Volume(network), trade.volume_usd());
            }
        }
        Ok(to_report(agg.rollup()))
    }
}
