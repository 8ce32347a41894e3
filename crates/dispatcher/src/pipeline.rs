//! DispatchPipeline - validate → claim → select → forward → acknowledge

use std::collections::BTreeMap;

use contracts::{
    AckEntry, AckSink, BatchStats, ContractError, DepthOracle, Destination, DestinationId,
    Envelope, ForwardSink, IdempotencyStore, InboundMessage, OutboundEntry, MISSING_RESULT,
    SEND_BATCH_ERROR,
};
use load_balancer::WeightTable;
use observability::{record_ack, record_batch, record_forward};
use tracing::{debug, error, info, instrument, warn};

use crate::context::DispatchContext;
use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::state::{MessageFailure, MessageOutcome, MessageState, Tracked};

/// Failure code used when a whole delete call fails
pub const DELETE_BATCH_ERROR: &str = "DeleteBatchError";

/// Selected positions per destination
type Groups = BTreeMap<DestinationId, (Destination, Vec<usize>)>;

/// Result of one batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub stats: BatchStats,
    /// One outcome per input message, in input order
    pub outcomes: Vec<MessageOutcome>,
}

impl BatchReport {
    pub fn outcome(&self, position: usize) -> Option<&MessageOutcome> {
        self.outcomes.get(position)
    }

    /// Successfully forwarded count per destination
    pub fn forwarded_by_destination(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        let forwarded = self.outcomes.iter().filter(|o| {
            !o.duplicate && matches!(o.state, MessageState::Forwarded | MessageState::Acknowledged)
        });
        for destination in forwarded.filter_map(|o| o.destination.as_ref()) {
            *counts.entry(destination.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Batch dispatch pipeline
///
/// `process_batch` takes `&self`; one pipeline behind an `Arc` can serve
/// concurrent batches.
pub struct DispatchPipeline<O, S, F, A> {
    context: DispatchContext<O, S>,
    forward: F,
    ack: A,
    metrics: DispatchMetrics,
}

impl<O, S, F, A> DispatchPipeline<O, S, F, A>
where
    O: DepthOracle + Sync,
    S: IdempotencyStore + Sync,
    F: ForwardSink + Sync,
    A: AckSink + Sync,
{
    pub fn new(context: DispatchContext<O, S>, forward: F, ack: A) -> Self {
        Self {
            context,
            forward,
            ack,
            metrics: DispatchMetrics::new(),
        }
    }

    pub fn context(&self) -> &DispatchContext<O, S> {
        &self.context
    }

    pub fn forward_sink(&self) -> &F {
        &self.forward
    }

    pub fn ack_sink(&self) -> &A {
        &self.ack
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Process one batch
    ///
    /// Per-message failures are isolated and reported in the returned
    /// [`BatchReport`]; a message is acknowledged only if it was a duplicate
    /// or was reported forwarded.
    ///
    /// # Errors
    /// [`DispatchError::Aborted`] if the idempotency store fails during
    /// claim. Claims for the whole batch run before any forwarding, so in
    /// that case nothing was forwarded and nothing was acknowledged.
    #[instrument(
        name = "dispatch_process_batch",
        skip(self, messages),
        fields(batch_size = messages.len())
    )]
    pub async fn process_batch(
        &self,
        messages: Vec<InboundMessage>,
    ) -> Result<BatchReport, DispatchError> {
        let mut batch: Vec<Tracked> = messages
            .into_iter()
            .enumerate()
            .map(|(position, message)| Tracked::new(position, message))
            .collect();
        let mut stats = BatchStats {
            total: batch.len() as u64,
            ..Default::default()
        };

        validate(&mut batch, &mut stats);

        if let Err(e) = self.claim(&mut batch, &mut stats).await {
            self.metrics.record_aborted();
            error!(error = %e, "Idempotency store unavailable, batch aborted without acknowledgment");
            return Err(DispatchError::Aborted(e));
        }

        let groups = self.select(&mut batch, &mut stats).await;
        self.forward_selected(&mut batch, &groups, &mut stats).await;
        self.acknowledge(&mut batch, &mut stats).await;

        record_batch(&stats);
        self.metrics.record_batch(&stats);
        info!(
            total = stats.total,
            forwarded = stats.forwarded,
            duplicate = stats.duplicate,
            failed = stats.failed(),
            acknowledged = stats.acknowledged,
            "Batch processed"
        );

        Ok(BatchReport {
            stats,
            outcomes: batch.into_iter().map(Tracked::into_outcome).collect(),
        })
    }

    /// Claim every validated message; the first store failure aborts
    async fn claim(
        &self,
        batch: &mut [Tracked],
        stats: &mut BatchStats,
    ) -> Result<(), ContractError> {
        for tracked in batch
            .iter_mut()
            .filter(|t| t.state == MessageState::Validated)
        {
            let Some(request_id) = tracked.request_id.as_deref() else {
                continue;
            };
            let first_time = self
                .context
                .guard()
                .claim(request_id, &tracked.message.body)
                .await?;

            if first_time {
                tracked.state = MessageState::Claimed;
            } else {
                tracked.state = MessageState::Duplicate;
                tracked.duplicate = true;
                stats.duplicate += 1;
            }
        }
        Ok(())
    }

    /// One load snapshot per batch, one independent draw per message
    async fn select(&self, batch: &mut [Tracked], stats: &mut BatchStats) -> Groups {
        if !batch.iter().any(|t| t.state == MessageState::Claimed) {
            return Groups::new();
        }
        let weights = self.context.router().weights().await;
        self.assign_destinations(batch, &weights, stats)
    }

    fn assign_destinations(
        &self,
        batch: &mut [Tracked],
        weights: &WeightTable,
        stats: &mut BatchStats,
    ) -> Groups {
        let mut rng = rand::rng();
        let mut groups = Groups::new();

        for tracked in batch
            .iter_mut()
            .filter(|t| t.state == MessageState::Claimed)
        {
            match self.context.router().pick(weights, &mut rng) {
                Ok(destination) => {
                    tracked.state = MessageState::Selected;
                    tracked.destination = Some(destination.id.clone());
                    stats.processed += 1;
                    groups
                        .entry(destination.id.clone())
                        .or_insert_with(|| (destination, Vec::new()))
                        .1
                        .push(tracked.position);
                }
                Err(e) => {
                    warn!(
                        request_id = tracked.request_id.as_deref().unwrap_or_default(),
                        error = %e,
                        "No destination available, leaving message for redelivery"
                    );
                    tracked.fail(MessageFailure::NoDestination(e.to_string()));
                    stats.selection_failed += 1;
                }
            }
        }
        groups
    }

    async fn forward_selected(
        &self,
        batch: &mut [Tracked],
        groups: &Groups,
        stats: &mut BatchStats,
    ) {
        let limit = self.forward.max_send_batch().max(1);

        for (destination, positions) in groups.values() {
            for chunk in positions.chunks(limit) {
                let entries: Vec<OutboundEntry> = chunk
                    .iter()
                    .map(|&p| OutboundEntry {
                        id: batch[p].entry_id(),
                        body: batch[p].message.body.clone(),
                    })
                    .collect();

                let result = match self.forward.send_batch(destination, &entries).await {
                    Ok(result) => result,
                    Err(e) => {
                        error!(
                            destination = %destination.id,
                            count = chunk.len(),
                            error = %e,
                            "Send batch failed"
                        );
                        for &p in chunk {
                            batch[p].fail(MessageFailure::Forward {
                                code: SEND_BATCH_ERROR.to_string(),
                                message: e.to_string(),
                            });
                        }
                        stats.forward_failed += chunk.len() as u64;
                        record_forward(destination.id.as_str(), false, chunk.len() as u64);
                        continue;
                    }
                };

                let mut succeeded = 0u64;
                for &p in chunk {
                    let tracked = &mut batch[p];
                    let id = tracked.entry_id();
                    if result.is_success(&id) {
                        tracked.state = MessageState::Forwarded;
                        succeeded += 1;
                        continue;
                    }

                    let failure = match result.failure(&id) {
                        Some(f) => MessageFailure::Forward {
                            code: f.code.clone(),
                            message: f.message.clone(),
                        },
                        None => MessageFailure::Forward {
                            code: MISSING_RESULT.to_string(),
                            message: "entry missing from send result".to_string(),
                        },
                    };
                    warn!(
                        destination = %destination.id,
                        request_id = tracked.request_id.as_deref().unwrap_or_default(),
                        failure = %failure,
                        "Message not forwarded"
                    );
                    tracked.fail(failure);
                }

                let failed = chunk.len() as u64 - succeeded;
                stats.forwarded += succeeded;
                stats.forward_failed += failed;
                record_forward(destination.id.as_str(), true, succeeded);
                if failed > 0 {
                    record_forward(destination.id.as_str(), false, failed);
                }
                debug!(
                    destination = %destination.id,
                    succeeded,
                    failed,
                    "Chunk forwarded"
                );
            }
        }
    }

    /// Delete duplicates and forwarded messages, grouped by source
    async fn acknowledge(&self, batch: &mut [Tracked], stats: &mut BatchStats) {
        let mut by_source: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for tracked in batch.iter().filter(|t| t.state.should_acknowledge()) {
            by_source
                .entry(tracked.ack().source.clone())
                .or_default()
                .push(tracked.position);
        }

        let limit = self.ack.max_delete_batch().max(1);
        for (source, positions) in &by_source {
            for chunk in positions.chunks(limit) {
                let entries: Vec<AckEntry> = chunk
                    .iter()
                    .map(|&p| AckEntry {
                        id: batch[p].entry_id(),
                        receipt: batch[p].ack().receipt.clone(),
                    })
                    .collect();

                let result = match self.ack.delete_batch(source, &entries).await {
                    Ok(result) => result,
                    Err(e) => {
                        error!(
                            source = %source,
                            count = chunk.len(),
                            error = %e,
                            "Delete batch failed, messages will be redelivered"
                        );
                        for &p in chunk {
                            batch[p].failure = Some(MessageFailure::Ack {
                                code: DELETE_BATCH_ERROR.to_string(),
                                message: e.to_string(),
                            });
                        }
                        stats.ack_failed += chunk.len() as u64;
                        record_ack(false, chunk.len() as u64);
                        continue;
                    }
                };

                let mut succeeded = 0u64;
                for &p in chunk {
                    let tracked = &mut batch[p];
                    let id = tracked.entry_id();
                    if result.is_success(&id) {
                        tracked.state = MessageState::Acknowledged;
                        succeeded += 1;
                        continue;
                    }

                    let (code, message) = match result.failure(&id) {
                        Some(f) => (f.code.clone(), f.message.clone()),
                        None => (
                            MISSING_RESULT.to_string(),
                            "entry missing from delete result".to_string(),
                        ),
                    };
                    warn!(
                        source = %source,
                        request_id = tracked.request_id.as_deref().unwrap_or_default(),
                        code = %code,
                        "Acknowledgment failed, message will be redelivered"
                    );
                    tracked.failure = Some(MessageFailure::Ack { code, message });
                }

                let failed = chunk.len() as u64 - succeeded;
                stats.acknowledged += succeeded;
                stats.ack_failed += failed;
                record_ack(true, succeeded);
                if failed > 0 {
                    record_ack(false, failed);
                }
            }
        }
    }
}

fn validate(batch: &mut [Tracked], stats: &mut BatchStats) {
    for tracked in batch.iter_mut() {
        match Envelope::parse(&tracked.message.body) {
            Ok(envelope) => {
                tracked.request_id = Some(envelope.request_id);
                tracked.state = MessageState::Validated;
            }
            Err(e) => {
                warn!(
                    position = tracked.position,
                    error = %e,
                    "Invalid message envelope, left for source redelivery policy"
                );
                tracked.fail(MessageFailure::Validation(e.to_string()));
                stats.validation_failed += 1;
            }
        }
    }
}
