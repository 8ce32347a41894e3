//! Sampler -> calculator -> selector in one call.

use std::sync::Arc;

use contracts::{ContractError, DepthOracle, Destination, DestinationId};
use observability::record_no_destination;
use rand::Rng;
use tracing::warn;

use crate::sampler::{LoadSampler, LoadSnapshot};
use crate::selector::QueueSelector;
use crate::weights::{WeightCalculator, WeightTable};

/// Picks a destination for one message from the current load picture
pub struct DestinationRouter<O> {
    sampler: LoadSampler<O>,
    calculator: WeightCalculator,
    selector: QueueSelector,
}

impl<O: DepthOracle + Sync> DestinationRouter<O> {
    pub fn new(sampler: LoadSampler<O>, calculator: WeightCalculator) -> Self {
        Self {
            sampler,
            calculator,
            selector: QueueSelector::new(),
        }
    }

    pub fn sampler(&self) -> &LoadSampler<O> {
        &self.sampler
    }

    pub fn calculator(&self) -> &WeightCalculator {
        &self.calculator
    }

    /// Current load snapshot (cached)
    pub async fn snapshot(&self) -> Arc<LoadSnapshot> {
        self.sampler.get_loads(false).await
    }

    /// Weights for the current snapshot
    pub async fn weights(&self) -> WeightTable {
        self.calculator.calculate(&*self.snapshot().await)
    }

    /// Run the full chain for one message
    pub async fn route(&self) -> Result<Destination, ContractError> {
        let weights = self.weights().await;
        self.pick(&weights, &mut rand::rng())
    }

    /// Draw from an already computed table; used to share one snapshot across a batch
    pub fn pick<R: Rng + ?Sized>(
        &self,
        weights: &WeightTable,
        rng: &mut R,
    ) -> Result<Destination, ContractError> {
        let id = self.selector.select_with(weights, rng).inspect_err(|e| {
            record_no_destination();
            warn!(error = %e, "No destination available");
        })?;
        self.resolve(&id)
    }

    fn resolve(&self, id: &DestinationId) -> Result<Destination, ContractError> {
        self.sampler
            .destination(id.as_str())
            .cloned()
            .ok_or_else(|| ContractError::UnknownDestination {
                destination: id.to_string(),
            })
    }
}
