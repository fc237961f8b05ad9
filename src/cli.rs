use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::analytics::{WalletBalanceEntry, WalletBalancesReport, WalletRole};
use crate::error::Result;

#[derive(Parser)]
#[command(name = "agentdash")]
#[command(version = "0.1.0")]
#[command(about = "Admin analytics backend for the trading-agent platform", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml plus per-environment overrides)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the admin API
    Serve {
        /// Override server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Assemble one report and print it to stdout
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
        /// Restrict trading-volume to one trader address
        #[arg(long)]
        trader: Option<String>,
        /// Render wallets as a table instead of JSON
        #[arg(long)]
        table: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Dashboard,
    AgentAnalytics,
    Wallets,
    TradingVolume,
    Onboarding,
}

/// Pretty JSON on stdout
pub fn print_json<T: Serialize>(item: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

#[derive(Debug, Tabled)]
struct WalletRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Type")]
    role: &'static str,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "ETH")]
    eth: String,
    #[tabled(rename = "Tokens")]
    tokens: String,
}

fn role_label(role: WalletRole) -> &'static str {
    match role {
        WalletRole::ProfitReceiver => "profit_receiver",
        WalletRole::SafeWallet => "safe_wallet",
        WalletRole::AgentAddress => "agent_address",
    }
}

impl From<&WalletBalanceEntry> for WalletRow {
    fn from(entry: &WalletBalanceEntry) -> Self {
        let owner = entry
            .agent_name
            .clone()
            .or_else(|| entry.user_wallet.clone())
            .unwrap_or_else(|| "-".to_string());
        let tokens = entry
            .token_balances
            .iter()
            .map(|(symbol, amount)| format!("{symbol} {amount}"))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            address: entry.address.clone(),
            role: role_label(entry.role),
            owner,
            eth: entry.eth_balance.clone(),
            tokens,
        }
    }
}

/// Wallet report as a table followed by the totals
pub fn print_wallet_table(report: &WalletBalancesReport) {
    if report.wallets.is_empty() {
        println!("(no wallets)");
    } else {
        let rows: Vec<WalletRow> = report.wallets.iter().map(WalletRow::from).collect();
        println!("{}", Table::new(rows));
    }

    println!();
    println!(
        "Wallets: {}  Addresses: {}  Total ETH: {}",
        report.totals.wallet_count, report.meta.address_count, report.totals.total_eth
    );
    for (symbol, total) in &report.totals.total_by_token {
        println!("  {symbol}: {total}");
    }
    println!("Fetched in {}", report.meta.duration);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parses_report_arguments() {
        let cli = Cli::parse_from([
            "agentdash",
            "--config",
            "/etc/agentdash",
            "report",
            "trading-volume",
            "--trader",
            "0xabc",
        ]);
        assert_eq!(cli.config, "/etc/agentdash");
        match cli.command {
            Commands::Report { kind, trader, table } => {
                assert_eq!(kind, ReportKind::TradingVolume);
                assert_eq!(trader.as_deref(), Some("0xabc"));
                assert!(!table);
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn test_serve_port_is_optional() {
        let cli = Cli::parse_from(["agentdash", "serve"]);
        assert_eq!(cli.config, "config");
        assert!(matches!(cli.command, Commands::Serve { port: None }));
    }

    #[test]
    fn test_wallet_row_lists_tokens() {
        let entry = WalletBalanceEntry {
            address: "0xAbC".to_string(),
            role: WalletRole::SafeWallet,
            agent_id: Some("a1".to_string()),
            agent_name: Some("Momentum".to_string()),
            deployment_id: Some("d1".to_string()),
            user_wallet: None,
            eth_balance: "0.5".to_string(),
            token_balances: BTreeMap::from([
                ("USDC".to_string(), "12.5".to_string()),
                ("WETH".to_string(), "0.25".to_string()),
            ]),
        };
        let row = WalletRow::from(&entry);
        assert_eq!(row.role, "safe_wallet");
        assert_eq!(row.owner, "Momentum");
        assert_eq!(row.tokens, "USDC 12.5, WETH 0.25");
    }
}
