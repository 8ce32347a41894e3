//! DispatchWorker - poll loop over an ingestion source

use std::sync::Arc;
use std::time::Duration;

use contracts::{AckSink, DepthOracle, ForwardSink, IdempotencyStore, IngestionSource};
use observability::{BatchMetricsAggregator, MetricsSummary};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::error::DispatchError;
use crate::pipeline::DispatchPipeline;

/// Default wait after an empty poll
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(500);

/// Polls a source and feeds batches to a pipeline
pub struct DispatchWorker<I, O, S, F, A> {
    source: I,
    pipeline: Arc<DispatchPipeline<O, S, F, A>>,
    max_batch_size: usize,
    idle_backoff: Duration,
}

impl<I, O, S, F, A> DispatchWorker<I, O, S, F, A>
where
    I: IngestionSource + Sync,
    O: DepthOracle + Sync,
    S: IdempotencyStore + Sync,
    F: ForwardSink + Sync,
    A: AckSink + Sync,
{
    pub fn new(source: I, pipeline: Arc<DispatchPipeline<O, S, F, A>>, max_batch_size: usize) -> Self {
        Self {
            source,
            pipeline,
            max_batch_size: max_batch_size.max(1),
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }

    /// Set the wait after an empty poll
    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn pipeline(&self) -> &Arc<DispatchPipeline<O, S, F, A>> {
        &self.pipeline
    }

    /// Run until `shutdown` becomes true
    ///
    /// Shutdown is checked between batches; a batch in progress always
    /// completes.
    #[instrument(name = "dispatch_worker_run", skip(self, shutdown), fields(source = self.source.name()))]
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<MetricsSummary, DispatchError> {
        info!(max_batch_size = self.max_batch_size, "Dispatch worker started");
        let mut aggregator = BatchMetricsAggregator::new();

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }
            let received = self.poll_once(&mut aggregator).await?;
            if received == 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.idle_backoff) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        let summary = aggregator.summary();
        info!(
            batches = summary.batches,
            aborted = summary.aborted_batches,
            messages = summary.totals.total,
            "Dispatch worker stopped"
        );
        Ok(summary)
    }

    /// Run until the source returns an empty poll
    #[instrument(name = "dispatch_worker_drain", skip(self), fields(source = self.source.name()))]
    pub async fn run_until_idle(&self) -> Result<MetricsSummary, DispatchError> {
        let mut aggregator = BatchMetricsAggregator::new();
        while self.poll_once(&mut aggregator).await? > 0 {}

        let summary = aggregator.summary();
        debug!(batches = summary.batches, "Source drained");
        Ok(summary)
    }

    /// Receive and process one batch; returns the number of messages received
    async fn poll_once(&self, aggregator: &mut BatchMetricsAggregator) -> Result<usize, DispatchError> {
        let messages = self
            .source
            .receive_batch(self.max_batch_size)
            .await
            .map_err(|e| DispatchError::receive(self.source.name(), e))?;

        let received = messages.len();
        if received == 0 {
            return Ok(0);
        }

        match self.pipeline.process_batch(messages).await {
            Ok(report) => {
                aggregator.update(&report.stats);
                for (destination, count) in report.forwarded_by_destination() {
                    aggregator.record_destination(&destination, count);
                }
            }
            Err(e) if e.is_aborted() => {
                // Nothing acknowledged: the source redelivers the whole batch
                error!(error = %e, count = received, "Batch aborted, left for redelivery");
                aggregator.record_aborted();
            }
            Err(e) => return Err(e),
        }
        Ok(received)
    }
}
