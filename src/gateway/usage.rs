//! Usage accounting.
//!
//! The recorder is the single writer of usage records. It runs on both the
//! success and failure paths of the forwarder; a write failure is logged
//! and counted but never alters the response already computed. A billing
//! discrepancy is preferable to failing an otherwise-successful call.

use std::sync::Arc;

use crate::observability::metrics;
use crate::store::{UsageRecord, UsageStore};

pub struct UsageRecorder {
    usage: Arc<dyn UsageStore>,
}

impl UsageRecorder {
    pub fn new(usage: Arc<dyn UsageStore>) -> Self {
        Self { usage }
    }

    /// Append exactly one record for a forwarder-reaching attempt.
    pub async fn record(&self, record: UsageRecord) {
        let target = record.target.clone();
        let status = record.status_code;
        if let Err(e) = self.usage.append(record).await {
            metrics::record_usage_write_failure(&target);
            tracing::error!(
                target = %target,
                status,
                error = %e,
                "usage record write failed; attempt is unbilled"
            );
        }
    }
}
