//! Destination - one regional queue in the registry

use serde::{Deserialize, Serialize};

use crate::DestinationId;

/// A registered destination queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Registry key (e.g. region name)
    pub id: DestinationId,

    /// Endpoint reference (queue URL or broker address)
    pub endpoint: String,
}

impl Destination {
    pub fn new(id: impl Into<DestinationId>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
        }
    }
}
