//! Trade job dispatcher: resolves a pair for each job, places the market
//! order and feeds bridge legs back into its own queue.

use crate::{
    connectors::{MarketOrder, OrderGateway, OrderQuantity, OrderReceipt, OrderSide},
    data::{Orientation, SymbolCatalog},
    log_job, log_order,
    trading::TradeJob,
    utils::{metrics, Notifier},
    ConvertError, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How a job will be executed
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A direct pair exists; place this order
    Order(MarketOrder),
    /// No direct pair; convert into the bridge asset first
    Bridge(TradeJob),
}

/// What processing a job produced
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// An order executed
    Settled {
        /// Exchange result
        receipt: OrderReceipt,
        /// Amount received in the job's destination asset
        proceeds: f64,
        /// Next leg of a bridged conversion
        follow_up: Option<TradeJob>,
    },
    /// No order was placed; the job was replaced by a bridge leg
    Rerouted(TradeJob),
}

impl JobOutcome {
    /// Job to enqueue next, if any
    pub fn follow_up(&self) -> Option<&TradeJob> {
        match self {
            JobOutcome::Settled { follow_up, .. } => follow_up.as_ref(),
            JobOutcome::Rerouted(job) => Some(job),
        }
    }
}

/// Counters returned when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Jobs taken from either queue
    pub processed: u64,
    /// Jobs whose order executed
    pub settled: u64,
    /// Jobs replaced by a bridge leg
    pub rerouted: u64,
    /// Jobs dropped after an error
    pub failed: u64,
}

/// Single worker executing trade jobs one at a time
pub struct TradeDispatcher {
    catalog: Arc<SymbolCatalog>,
    gateway: Arc<dyn OrderGateway>,
    notifier: Notifier,
    bridge_asset: String,
    order_timeout: Duration,
}

impl TradeDispatcher {
    /// Create a dispatcher
    pub fn new(
        catalog: Arc<SymbolCatalog>,
        gateway: Arc<dyn OrderGateway>,
        notifier: Notifier,
        bridge_asset: &str,
        order_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            gateway,
            notifier,
            bridge_asset: bridge_asset.to_uppercase(),
            order_timeout,
        }
    }

    /// Pick the pair and side for a job without touching the exchange
    pub fn resolve(&self, job: &TradeJob) -> Result<Resolution> {
        if !job.amount.is_finite() || job.amount <= 0.0 {
            return Err(ConvertError::InvalidJob(format!("non-positive amount in {}", job)).into());
        }
        if job.from.eq_ignore_ascii_case(&job.to) {
            return Err(ConvertError::InvalidJob(format!("{} converts into itself", job.from)).into());
        }

        if let Some(pair) = self.catalog.lookup(&job.from, &job.to) {
            let (side, quantity) = match pair.orientation {
                Orientation::Forward => (OrderSide::Sell, OrderQuantity::Base(job.amount)),
                Orientation::Reverse => (OrderSide::Buy, OrderQuantity::Quote(job.amount)),
            };
            return Ok(Resolution::Order(MarketOrder {
                symbol: pair.symbol.symbol.clone(),
                side,
                quantity,
                precision: self.catalog.precision_of(pair.symbol),
            }));
        }

        if job.can_bridge(&self.bridge_asset) {
            return Ok(Resolution::Bridge(job.bridge_leg(&self.bridge_asset)));
        }

        Err(ConvertError::NoRoute {
            from: job.from.clone(),
            to: job.to.clone(),
        }
        .into())
    }

    /// Resolve a job and, when a pair exists, execute it
    pub async fn process_job(&self, job: TradeJob) -> Result<JobOutcome> {
        let order = match self.resolve(&job)? {
            Resolution::Order(order) => order,
            Resolution::Bridge(leg) => {
                info!(
                    "Direct symbol {}/{} not found, trading via {}",
                    job.from, job.to, self.bridge_asset
                );
                return Ok(JobOutcome::Rerouted(leg));
            }
        };

        log_order!(info, order.symbol, order.side, order.formatted_quantity(), "Placing market order");

        let receipt = tokio::time::timeout(self.order_timeout, self.gateway.submit_market_order(&order))
            .await
            .map_err(|_| {
                ConvertError::Timeout(format!(
                    "{} {} not answered within {:?}",
                    order.symbol, order.side, self.order_timeout
                ))
            })??;

        let proceeds = receipt.proceeds()?;
        self.notifier
            .notify(format!("executed {} {} {}", receipt.symbol, receipt.side, proceeds));

        let follow_up = match job.continue_with(proceeds) {
            Some(next) if proceeds > 0.0 => {
                self.notifier.notify(format!("bridge leg settled, trading {}", next));
                Some(next)
            }
            Some(next) => {
                warn!("Bridge leg for {} returned no proceeds, nothing to forward", next.to);
                None
            }
            None => None,
        };

        Ok(JobOutcome::Settled {
            receipt,
            proceeds,
            follow_up,
        })
    }

    /// Consume jobs until the queue closes, then finish pending follow-ups.
    ///
    /// Follow-up jobs go to an internal unbounded queue merged with `jobs`,
    /// so emitting one never waits on the queue this worker drains.
    pub async fn run(self, mut jobs: mpsc::Receiver<TradeJob>) -> DispatcherStats {
        let (follow_tx, mut follow_rx) = mpsc::unbounded_channel();
        let mut stats = DispatcherStats::default();
        info!("Trade dispatcher started");

        loop {
            tokio::select! {
                Some(job) = follow_rx.recv() => self.handle(job, &follow_tx, &mut stats).await,
                next = jobs.recv() => match next {
                    Some(job) => self.handle(job, &follow_tx, &mut stats).await,
                    None => break,
                },
            }
        }

        while let Ok(job) = follow_rx.try_recv() {
            self.handle(job, &follow_tx, &mut stats).await;
        }

        info!(
            processed = stats.processed,
            settled = stats.settled,
            rerouted = stats.rerouted,
            failed = stats.failed,
            "Trade dispatcher stopped"
        );
        stats
    }

    async fn handle(
        &self,
        job: TradeJob,
        follow_ups: &mpsc::UnboundedSender<TradeJob>,
        stats: &mut DispatcherStats,
    ) {
        stats.processed += 1;

        match self.process_job(job.clone()).await {
            Ok(outcome) => {
                match outcome {
                    JobOutcome::Settled { .. } => {
                        stats.settled += 1;
                        metrics::record_trade_job("settled");
                    }
                    JobOutcome::Rerouted(_) => {
                        stats.rerouted += 1;
                        metrics::record_trade_job("rerouted");
                    }
                }
                if let Some(next) = outcome.follow_up() {
                    // The receiver lives in `run`, so this cannot fail while we are here
                    let _ = follow_ups.send(next.clone());
                }
            }
            Err(e) => {
                stats.failed += 1;
                metrics::record_trade_job("failed");
                log_job!(error, job, error = %e, "Dropping trade job");
            }
        }
    }
}
