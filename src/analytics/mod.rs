//! Admin analytics core.
//!
//! - [`balances`]: batched native and token balance reads
//! - [`volume`]: trade notional normalization and the trade index seam
//! - [`buckets`]: calendar-day bucketing with running totals
//! - [`assembler`]: per-endpoint orchestration
//! - [`reports`]: response documents

pub mod assembler;
pub mod balances;
pub mod buckets;
pub mod reports;
pub mod volume;

pub use assembler::{AssemblerSettings, StatsAssembler};
pub use balances::{BatchCaller, CallDescriptor, CallOutcome, ChainBatchReader, WalletBalances};
pub use buckets::{AggregateSeries, DateBucket, DateBucketAggregator, DateWindow, TimestampedRecord};
pub use reports::*;
pub use volume::{normalize_notional, SubgraphTrade, TradeIndex};
