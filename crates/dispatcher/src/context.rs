//! Worker-scoped shared state: load cache + idempotency guard

use contracts::{DepthOracle, DistributorConfig, IdempotencyStore};
use idempotency::IdempotencyGuard;
use load_balancer::{DestinationRouter, LoadSampler, WeightCalculator};

/// Long-lived state shared by every batch of one worker
pub struct DispatchContext<O, S> {
    router: DestinationRouter<O>,
    guard: IdempotencyGuard<S>,
}

impl<O, S> DispatchContext<O, S>
where
    O: DepthOracle + Sync,
    S: IdempotencyStore + Sync,
{
    pub fn new(router: DestinationRouter<O>, guard: IdempotencyGuard<S>) -> Self {
        Self { router, guard }
    }

    /// Wire sampler, calculator and guard from configuration
    pub fn from_config(config: &DistributorConfig, oracle: O, store: S) -> Self {
        let sampler = LoadSampler::new(oracle, config.destination_list(), config.cache_ttl());
        let calculator = WeightCalculator::new(config.max_queue_depth_threshold);
        Self {
            router: DestinationRouter::new(sampler, calculator),
            guard: IdempotencyGuard::new(store, config.retention()),
        }
    }

    pub fn router(&self) -> &DestinationRouter<O> {
        &self.router
    }

    pub fn guard(&self) -> &IdempotencyGuard<S> {
        &self.guard
    }
}
