use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;
use tracing::info;

use super::{elapsed_label, StatsAssembler};
use crate::analytics::reports::{
    WalletBalanceEntry, WalletBalancesReport, WalletMeta, WalletRole, WalletTotals,
};
use crate::domain::CanonicalAddress;
use crate::error::Result;
use crate::ledger::{LedgerFilter, Presence};

/// Who an address belongs to, before balances are attached
#[derive(Debug, Clone)]
struct TrackedWallet {
    address: String,
    role: WalletRole,
    agent_id: Option<String>,
    agent_name: Option<String>,
    deployment_id: Option<String>,
    user_wallet: Option<String>,
}

/// Tracked wallets grouped by canonical address in first-seen order
#[derive(Default)]
struct WalletBook {
    order: Vec<CanonicalAddress>,
    entries: HashMap<CanonicalAddress, Vec<TrackedWallet>>,
}

impl WalletBook {
    fn track(&mut self, wallet: TrackedWallet) {
        let key = CanonicalAddress::new(&wallet.address);
        if key.as_str().is_empty() {
            return;
        }
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.entry(key).or_default().push(wallet);
    }
}

fn parse_amount(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or(Decimal::ZERO)
}

impl StatsAssembler {
    /// Native and token balances of every tracked wallet.
    ///
    /// The three source lists are required. Chain failures only zero the
    /// balances they cover.
    pub async fn wallet_balances(&self, now: DateTime<Utc>) -> Result<WalletBalancesReport> {
        let started = Instant::now();
        let safe_filter = LedgerFilter::all().require(Presence::SafeWallet);

        let (agents, deployments, user_addresses) = tokio::try_join!(
            self.ledger.list_agents(),
            self.ledger.list_deployments(&safe_filter),
            self.ledger.list_user_agent_addresses(),
        )?;

        let mut book = WalletBook::default();
        for agent in &agents {
            if let Some(receiver) = &agent.profit_receiver_address {
                book.track(TrackedWallet {
                    address: receiver.clone(),
                    role: WalletRole::ProfitReceiver,
                    agent_id: Some(agent.id.clone()),
                    agent_name: Some(agent.name.clone()),
                    deployment_id: None,
                    user_wallet: None,
                });
            }
        }
        let agent_names: HashMap<&str, &str> = agents
            .iter()
            .map(|a| (a.id.as_str(), a.name.as_str()))
            .collect();
        for deployment in &deployments {
            let Some(safe) = deployment.safe_wallet.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            book.track(TrackedWallet {
                address: safe.to_string(),
                role: WalletRole::SafeWallet,
                agent_id: Some(deployment.agent_id.clone()),
                agent_name: agent_names
                    .get(deployment.agent_id.as_str())
                    .map(|name| name.to_string()),
                deployment_id: Some(deployment.id.clone()),
                user_wallet: Some(deployment.user_wallet.clone()),
            });
        }
        for record in &user_addresses {
            for address in [&record.hyperliquid_agent_address, &record.ostium_agent_address]
                .into_iter()
                .flatten()
            {
                book.track(TrackedWallet {
                    address: address.clone(),
                    role: WalletRole::AgentAddress,
                    agent_id: None,
                    agent_name: None,
                    deployment_id: None,
                    user_wallet: Some(record.user_wallet.clone()),
                });
            }
        }

        let addresses: Vec<&str> = book.order.iter().map(|a| a.as_str()).collect();
        info!(addresses = addresses.len(), "Fetching wallet balances");
        let balances = self.chain.fetch_balances(&addresses, &self.tokens).await;

        let mut wallets = Vec::new();
        let mut totals = WalletTotals::default();
        for key in &book.order {
            let Some(balance) = balances.get(key) else {
                continue;
            };
            for tracked in book.entries.remove(key).unwrap_or_default() {
                totals.total_eth += parse_amount(&balance.native_balance);
                for (symbol, amount) in &balance.token_balances {
                    *totals.total_by_token.entry(symbol.clone()).or_default() += parse_amount(amount);
                }
                wallets.push(WalletBalanceEntry {
                    address: tracked.address,
                    role: tracked.role,
                    agent_id: tracked.agent_id,
                    agent_name: tracked.agent_name,
                    deployment_id: tracked.deployment_id,
                    user_wallet: tracked.user_wallet,
                    eth_balance: balance.native_balance.clone(),
                    token_balances: balance.token_balances.clone(),
                });
            }
        }
        totals.wallet_count = wallets.len();

        let duration = elapsed_label(started);
        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            addresses = book.order.len(),
            "Wallet balances assembled"
        );

        Ok(WalletBalancesReport {
            wallets,
            totals,
            meta: WalletMeta {
                fetched_at: now,
                duration,
                address_count: book.order.len(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::domain::{AgentRecord, DeploymentRecord, UserAgentAddressRecord};
    use crate::ledger::Entity;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    const SHARED: &str = "0x00000000000000000000000000000000000000aB";

    fn ledger() -> MemoryLedger {
        MemoryLedger {
            agents: vec![AgentRecord {
                id: "a1".to_string(),
                name: "Alpha".to_string(),
                profit_receiver_address: Some(SHARED.to_string()),
                ..Default::default()
            }],
            deployments: vec![
                DeploymentRecord {
                    id: "d1".to_string(),
                    agent_id: "a1".to_string(),
                    user_wallet: "0xuser".to_string(),
                    safe_wallet: Some(SHARED.to_lowercase()),
                    ..Default::default()
                },
                DeploymentRecord {
                    id: "d2".to_string(),
                    agent_id: "a1".to_string(),
                    safe_wallet: Some(String::new()),
                    ..Default::default()
                },
            ],
            user_agent_addresses: vec![UserAgentAddressRecord {
                user_wallet: "0xuser".to_string(),
                hyperliquid_agent_address: Some("0x00000000000000000000000000000000000000cc".to_string()),
                ostium_agent_address: None,
                created_at: Utc::now(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_one_entry_per_role_and_one_read_per_address() {
        let caller = Arc::new(FixedBalanceCaller {
            balance: 2_000_000,
            ..Default::default()
        });
        let report = assembler(ledger(), caller.clone(), MemoryTradeIndex::default())
            .wallet_balances(Utc::now())
            .await
            .unwrap();

        assert_eq!(caller.submissions.load(Ordering::SeqCst), 1);
        assert_eq!(report.meta.address_count, 2);
        assert_eq!(report.wallets.len(), 3);
        assert_eq!(report.totals.wallet_count, 3);

        let roles: Vec<WalletRole> = report.wallets.iter().map(|w| w.role).collect();
        assert_eq!(
            roles,
            vec![WalletRole::ProfitReceiver, WalletRole::SafeWallet, WalletRole::AgentAddress]
        );
        assert_eq!(report.wallets[0].address, SHARED);
        assert_eq!(report.wallets[1].agent_name.as_deref(), Some("Alpha"));
        assert_eq!(report.wallets[1].deployment_id.as_deref(), Some("d1"));

        // 2_000_000 wei of native, and 2.0 of each 6-decimal token
        assert_eq!(report.wallets[0].token_balances.get("USDC").map(String::as_str), Some("2.0"));
        assert_eq!(report.totals.total_by_token.get("USDC"), Some(&dec!(6)));
        assert_eq!(report.totals.total_eth, dec!(0.000000000006));
    }

    #[tokio::test]
    async fn test_json_uses_snake_case_roles_and_skips_missing_fields() {
        let report = assembler(ledger(), Arc::new(FixedBalanceCaller::default()), MemoryTradeIndex::default())
            .wallet_balances(Utc::now())
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["wallets"][0]["type"], "profit_receiver");
        assert_eq!(json["wallets"][2]["type"], "agent_address");
        assert!(json["wallets"][2].get("agentId").is_none());
        assert_eq!(json["wallets"][0]["ethBalance"], "0.0");
        assert_eq!(json["meta"]["addressCount"], 2);
    }

    #[tokio::test]
    async fn test_source_list_failure_is_an_error() {
        let mut failing = ledger();
        failing.failing = vec![Entity::UserAgentAddresses];
        let result = assembler(failing, Arc::new(FixedBalanceCaller::default()), MemoryTradeIndex::default())
            .wallet_balances(Utc::now())
            .await;
        assert!(result.is_err());
    }
}
