//! Call statistics kept by the built-in filters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Statistics for a built-in filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterStats {
    /// Total calls that reached the filter
    pub total_invoked: u64,
    /// Calls the filter rejected
    pub total_blocked: u64,
    /// Calls that came back with a fault
    pub total_failed: u64,
    /// Average processing time in milliseconds
    pub avg_processing_time_ms: f64,
    /// Last processed timestamp
    pub last_processed: Option<DateTime<Utc>>,
}

impl FilterStats {
    /// Account for one call that spent `elapsed` in the filter.
    pub fn record(&mut self, elapsed: Duration) {
        self.total_invoked += 1;
        self.last_processed = Some(Utc::now());

        let elapsed = elapsed.as_secs_f64() * 1000.0;
        self.avg_processing_time_ms = (self.avg_processing_time_ms
            * (self.total_invoked - 1) as f64
            + elapsed)
            / self.total_invoked as f64;
    }
}
