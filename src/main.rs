use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use agentdash::adapters::{start_api_server, AlloyMulticall, PostgresStore, SubgraphClient};
use agentdash::analytics::{AssemblerSettings, ChainBatchReader, StatsAssembler};
use agentdash::api::AppState;
use agentdash::cli::{self, Cli, Commands, ReportKind};
use agentdash::config::AppConfig;
use agentdash::error::{DashError, Result};

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve { port } => {
            init_logging(&config.logging);
            let port = port.unwrap_or(config.server.port);
            let assembler = build_assembler(&config).await?;

            info!(port, "Starting admin analytics API");
            start_api_server(AppState::new(assembler), port, shutdown_signal()).await?;
        }
        Commands::Report { kind, trader, table } => {
            init_logging_simple();
            let assembler = build_assembler(&config).await?;
            run_report(&assembler, kind, trader.as_deref(), table).await?;
        }
    }

    Ok(())
}

fn load_config(dir: &str) -> Result<AppConfig> {
    let config = AppConfig::load_from(dir)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("config: {e}");
        }
        return Err(DashError::Validation(format!(
            "{} configuration error(s) in {dir}",
            errors.len()
        )));
    }
    Ok(config)
}

/// Wires the ledger pool, the chain provider and the trade index into one assembler
async fn build_assembler(config: &AppConfig) -> Result<StatsAssembler> {
    let store = PostgresStore::new(&config.database.url, config.database.max_connections).await?;

    let multicall = AlloyMulticall::new(&config.chain.rpc_url, &config.chain.multicall_address)?;
    let multicall_address = multicall.multicall_address();
    let chain = ChainBatchReader::new(Arc::new(multicall), multicall_address, config.chain.chunk_size);

    let subgraph = SubgraphClient::new(&config.subgraph)?;

    Ok(StatsAssembler::new(
        Arc::new(store),
        chain,
        Arc::new(subgraph),
        config.chain.tokens.clone(),
        AssemblerSettings::from(&config.analytics),
    ))
}

async fn run_report(
    assembler: &StatsAssembler,
    kind: ReportKind,
    trader: Option<&str>,
    table: bool,
) -> Result<()> {
    let started = Instant::now();
    let now = chrono::Utc::now();

    let result = match kind {
        ReportKind::Dashboard => cli::print_json(&assembler.dashboard_stats(now).await?),
        ReportKind::AgentAnalytics => cli::print_json(&assembler.agent_analytics(now).await?),
        ReportKind::Wallets => {
            let report = assembler.wallet_balances(now).await?;
            if table {
                cli::print_wallet_table(&report);
                Ok(())
            } else {
                cli::print_json(&report)
            }
        }
        ReportKind::TradingVolume => {
            let report = match trader.map(str::trim).filter(|t| !t.is_empty()) {
                Some(trader) => assembler.trader_volume(trader).await?,
                None => assembler.trading_volume().await?,
            };
            cli::print_json(&report)
        }
        ReportKind::Onboarding => cli::print_json(&assembler.onboarded_users().await?),
    };

    if let Err(e) = &result {
        error!(?kind, error = %e, "Report output failed");
    }
    info!(?kind, duration_ms = started.elapsed().as_millis() as u64, "Report finished");
    result
}
