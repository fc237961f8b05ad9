use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::analytics::StatsAssembler;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Builds every admin report; holds the injected ledger, chain and trade index handles
    pub assembler: Arc<StatsAssembler>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(assembler: StatsAssembler) -> Self {
        Self {
            assembler: Arc::new(assembler),
            start_time: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
