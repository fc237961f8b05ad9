pub mod adapters;
pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod domain;
pub mod error;
pub mod ledger;

pub use analytics::{AssemblerSettings, ChainBatchReader, StatsAssembler};
pub use config::AppConfig;
pub use error::{DashError, Result};
pub use ledger::{Entity, Ledger, LedgerFilter};
