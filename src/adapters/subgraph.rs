//! GraphQL client for the external trade index.
//!
//! Failures never escape: a bad chunk or a bad wallet query is logged and
//! contributes no trades.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::analytics::volume::{SubgraphTrade, TradeIndex};
use crate::config::SubgraphConfig;
use crate::domain::{CanonicalAddress, Network};
use crate::error::{DashError, Result};

const TRADES_BY_IDS: &str = r#"
query GetTradesByIds($tradeIds: [String!], $first: Int!) {
    trades(first: $first, where: { tradeID_in: $tradeIds }) {
        id
        tradeID
        tradeNotional
        notional
        timestamp
        isOpen
    }
}
"#;

const TRADES_BY_TRADER: &str = r#"
query GetTradesByTrader($trader: String!, $first: Int!, $lastId: String!) {
    trades(first: $first, where: { trader: $trader, id_gt: $lastId }, orderBy: id, orderDirection: asc) {
        id
        tradeID
        tradeNotional
        notional
        timestamp
        isOpen
    }
}
"#;

/// Rows per page of a trader's history; a Graph node caps `first` at 1000
const TRADER_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<TradesData>,
    errors: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct TradesData {
    #[serde(default)]
    trades: Vec<SubgraphTrade>,
}

/// Trades out of a GraphQL body; an `errors` array fails the whole body
fn parse_trades(body: &str) -> Result<Vec<SubgraphTrade>> {
    let response: GraphQlResponse = serde_json::from_str(body)?;
    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        return Err(DashError::Subgraph(format!(
            "{} GraphQL error(s): {}",
            errors.len(),
            Value::Array(errors)
        )));
    }
    Ok(response.data.map(|d| d.trades).unwrap_or_default())
}

/// Keyset pagination over `id`: fetch pages after the last seen id until a
/// short page comes back
async fn collect_pages<F, Fut>(page_size: usize, mut fetch_after: F) -> Result<Vec<SubgraphTrade>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<SubgraphTrade>>>,
{
    let mut trades: Vec<SubgraphTrade> = Vec::new();
    let mut last_id = String::new();
    loop {
        let page = fetch_after(last_id.clone()).await?;
        let full = page.len() >= page_size;
        let next_id = match page.last() {
            Some(trade) => trade.id.clone(),
            None => break,
        };
        trades.extend(page);
        // A cursor that does not advance would loop forever
        if !full || next_id <= last_id {
            break;
        }
        last_id = next_id;
    }
    Ok(trades)
}

#[derive(Clone)]
pub struct SubgraphClient {
    http: Client,
    mainnet_url: String,
    testnet_url: String,
    chunk_size: usize,
}

impl SubgraphClient {
    pub fn new(config: &SubgraphConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("agentdash/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DashError::Internal(format!("failed to build subgraph HTTP client: {}", e)))?;

        Ok(Self {
            http,
            mainnet_url: config.mainnet_url.clone(),
            testnet_url: config.testnet_url.clone(),
            chunk_size: config.chunk_size.max(1),
        })
    }

    fn endpoint(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.mainnet_url,
            Network::Testnet => &self.testnet_url,
        }
    }

    async fn query(&self, network: Network, query: &str, variables: Value) -> Result<Vec<SubgraphTrade>> {
        let response = self
            .http
            .post(self.endpoint(network))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashError::Subgraph(format!("HTTP {status}")));
        }
        parse_trades(&response.text().await?)
    }
}

#[async_trait]
impl TradeIndex for SubgraphClient {
    async fn trades_by_ids(&self, network: Network, trade_ids: &[String]) -> HashMap<String, SubgraphTrade> {
        let mut found = HashMap::new();
        for (index, chunk) in trade_ids.chunks(self.chunk_size).enumerate() {
            match self
                .query(
                    network,
                    TRADES_BY_IDS,
                    json!({ "tradeIds": chunk, "first": chunk.len() }),
                )
                .await
            {
                Ok(trades) => {
                    debug!(%network, chunk = index, trades = trades.len(), "Subgraph chunk fetched");
                    found.extend(trades.into_iter().map(|t| (t.trade_id.clone(), t)));
                }
                Err(e) => {
                    warn!(%network, chunk = index, ids = chunk.len(), error = %e, "Subgraph chunk dropped");
                }
            }
        }
        found
    }

    async fn trades_by_trader(&self, network: Network, trader: &CanonicalAddress) -> Vec<SubgraphTrade> {
        let pages = collect_pages(TRADER_PAGE_SIZE, |last_id| {
            self.query(
                network,
                TRADES_BY_TRADER,
                json!({ "trader": trader.as_str(), "first": TRADER_PAGE_SIZE, "lastId": last_id }),
            )
        })
        .await;

        match pages {
            Ok(trades) => {
                debug!(%network, %trader, trades = trades.len(), "Trader history fetched");
                trades
            }
            Err(e) => {
                warn!(%network, %trader, error = %e, "Subgraph trader query failed");
                Vec::new()
            }
        }
    }
}
