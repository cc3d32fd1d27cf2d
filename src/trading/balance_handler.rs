//! Turns balance-change notifications into trade jobs

use crate::{
    connectors::BalanceChangeEvent,
    trading::{ConversionRules, TradeJob},
    utils::{metrics, Notifier},
    ConvertError, Result,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Feeds the dispatcher queue from balance notifications
pub struct BalanceEventHandler {
    rules: Arc<ConversionRules>,
    jobs: mpsc::Sender<TradeJob>,
    notifier: Notifier,
}

impl BalanceEventHandler {
    /// Create a handler writing into `jobs`
    pub fn new(rules: Arc<ConversionRules>, jobs: mpsc::Sender<TradeJob>, notifier: Notifier) -> Self {
        Self {
            rules,
            jobs,
            notifier,
        }
    }

    /// Enqueue the jobs for one event and return how many were queued.
    ///
    /// Waits for queue space rather than dropping jobs. Fails only when the
    /// dispatcher has gone away.
    pub async fn handle(&self, event: &BalanceChangeEvent) -> Result<usize> {
        if event.change.is_nan() || event.change <= 0.0 {
            info!("Skipping non-positive balance update {} {}", event.asset, event.change);
            metrics::record_balance_event("ignored");
            return Ok(0);
        }
        if !self.rules.covers(&event.asset) {
            info!("Skipping unconfigured balance update {} {}", event.asset, event.change);
            metrics::record_balance_event("ignored");
            return Ok(0);
        }

        metrics::record_balance_event("accepted");
        self.notifier
            .notify(format!("balance updated: {} {}", event.change, event.asset));

        let allocations = self.rules.allocate(&event.asset, event.change);
        let queued = allocations.len();
        for allocation in allocations {
            self.notifier.notify(format!(
                "trading {}% of {} to {}",
                allocation.percent, allocation.job.from, allocation.job.to
            ));
            self.jobs
                .send(allocation.job)
                .await
                .map_err(|_| ConvertError::Connection("Trade job queue closed".to_string()))?;
        }

        Ok(queued)
    }

    /// Handle events until the stream ends or the dispatcher stops
    pub async fn run(self, mut events: mpsc::Receiver<BalanceChangeEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(&event).await {
                error!("Stopping balance handler: {}", e);
                return Err(e);
            }
        }
        info!("Balance event stream ended");
        Ok(())
    }
}
