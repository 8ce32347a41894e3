//! # Ingestion
//!
//! In-memory queue service for the distributor.
//!
//! Responsibilities:
//! - Ingestion queue with receive / in-flight / delete semantics
//! - Destination queues with observable depth
//! - Redelivery of unacknowledged messages
//! - Fault injection for sends, deletes and depth queries
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BrokerConfig, MemoryBroker};
//!
//! let broker = MemoryBroker::new(BrokerConfig::default())
//!     .with_destinations(&config.destination_list());
//! broker.enqueue(r#"{"request_id":"req-1"}"#);
//!
//! let batch = broker.receive_batch(10).await?;
//! ```

mod broker;
mod config;

// Re-exports
pub use broker::{MemoryBroker, RECEIPT_INVALID, SEND_REJECTED};
pub use config::{BrokerConfig, BrokerMetrics, BrokerMetricsSnapshot};
