//! # Contracts
//!
//! Frozen interface contracts shared by every distributor crate: message and
//! envelope types, destination identifiers, per-entry batch results, the
//! idempotency record, and the async traits for the external services
//! (ingestion source, depth oracle, forward sink, ack sink, idempotency store).
//! All business crates depend on this crate only, never on each other's internals.
//!
//! ## Delivery model
//! - Messages are delivered in bounded batches and acknowledged individually
//! - A message that is not acknowledged is redelivered by its source
//! - The idempotency record is the only durable state

mod batch;
mod config;
mod destination;
mod destination_id;
mod error;
mod idempotency;
mod message;
mod oracle;
mod sink;
mod source;
mod stats;
mod store;

pub use batch::*;
pub use config::*;
pub use destination::Destination;
pub use destination_id::DestinationId;
pub use error::*;
pub use idempotency::*;
pub use message::*;
pub use oracle::{DepthOracle, LocalDepthOracle};
pub use sink::{AckSink, ForwardSink, LocalAckSink, LocalForwardSink, DEFAULT_MAX_BATCH_SIZE};
pub use source::{IngestionSource, LocalIngestionSource};
pub use stats::BatchStats;
pub use store::{IdempotencyStore, LocalIdempotencyStore};
