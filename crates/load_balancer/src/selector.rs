//! Weighted random destination selection.

use contracts::{ContractError, DestinationId};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use tracing::trace;

use crate::weights::WeightTable;

/// Memoryless weighted draw over a [`WeightTable`]
///
/// No state is kept between calls: repeated selections from the same table
/// are independent draws, not a rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueSelector;

impl QueueSelector {
    pub fn new() -> Self {
        Self
    }

    /// Draw one destination using the thread-local RNG
    pub fn select(&self, weights: &WeightTable) -> Result<DestinationId, ContractError> {
        self.select_with(weights, &mut rand::rng())
    }

    /// Draw one destination using `rng`
    pub fn select_with<R: Rng + ?Sized>(
        &self,
        weights: &WeightTable,
        rng: &mut R,
    ) -> Result<DestinationId, ContractError> {
        if weights.is_empty() {
            return Err(ContractError::no_destination(
                "weight table is empty: no admissible destination",
            ));
        }

        let (ids, values): (Vec<&DestinationId>, Vec<f64>) = weights.iter().unzip();
        let index = WeightedIndex::new(&values)
            .map_err(|e| ContractError::no_destination(format!("invalid weights: {e}")))?;

        let chosen = ids[index.sample(rng)].clone();
        trace!(destination = %chosen, "Destination selected");
        Ok(chosen)
    }
}
