//! Layered error definitions
//!
//! Categorized by source: config / envelope / store / destination / sink / source

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Message Errors =====
    /// Envelope is not JSON, not an object, or has no usable `request_id`
    #[error("invalid message envelope: {message}")]
    InvalidEnvelope { message: String },

    // ===== Idempotency Store Errors =====
    /// Store failed for a reason other than "record already exists"
    #[error("idempotency store unavailable while claiming '{request_id}': {source}")]
    StoreUnavailable {
        request_id: String,
        #[source]
        source: StoreError,
    },

    // ===== Destination Errors =====
    /// Depth query against a destination failed
    #[error("depth query failed for destination '{destination}': {message}")]
    DestinationQuery {
        destination: String,
        message: String,
    },

    /// Destination not present in the registry
    #[error("unknown destination '{destination}'")]
    UnknownDestination { destination: String },

    /// No admissible destination (registry empty or all overloaded)
    #[error("no destination available: {reason}")]
    NoDestinationAvailable { reason: String },

    // ===== Sink Errors =====
    /// Whole-call failure of a batched send
    #[error("send to destination '{destination}' failed: {message}")]
    SinkSend {
        destination: String,
        message: String,
    },

    /// Whole-call failure of a batched delete
    #[error("delete from source '{source_queue}' failed: {message}")]
    SinkDelete {
        source_queue: String,
        message: String,
    },

    // ===== Ingestion Errors =====
    /// Polling the ingestion source failed
    #[error("ingestion source '{source_queue}' receive failed: {message}")]
    SourceReceive {
        source_queue: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create envelope validation error
    pub fn invalid_envelope(message: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            message: message.into(),
        }
    }

    /// Create store error for a claim
    pub fn store_unavailable(request_id: impl Into<String>, source: StoreError) -> Self {
        Self::StoreUnavailable {
            request_id: request_id.into(),
            source,
        }
    }

    /// Create depth query error
    pub fn destination_query(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationQuery {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create "no destination available" error
    pub fn no_destination(reason: impl Into<String>) -> Self {
        Self::NoDestinationAvailable {
            reason: reason.into(),
        }
    }

    /// Create batched send error
    pub fn sink_send(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkSend {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create batched delete error
    pub fn sink_delete(source_queue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkDelete {
            source_queue: source_queue.into(),
            message: message.into(),
        }
    }

    /// True for the one error kind that must abort a whole batch
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

/// Idempotency store failure other than a failed precondition
///
/// "Record already exists" is not an error; it is reported as
/// [`InsertOutcome::AlreadyExists`](crate::InsertOutcome::AlreadyExists).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Store could not be reached
    #[error("store unreachable: {0}")]
    Unavailable(String),

    /// Request rejected due to throughput limits
    #[error("store throttled: {0}")]
    Throttled(String),

    /// Stored data could not be decoded
    #[error("store data corrupted: {0}")]
    Corrupted(String),

    /// Anything else
    #[error("store error: {0}")]
    Other(String),
}
