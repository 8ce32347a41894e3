//! # Dispatcher
//!
//! 批次分发模块。
//!
//! 负责：
//! - 校验消息信封，基于幂等性 claim 去重
//! - 每条消息独立按负载加权选择目标队列
//! - 按目标分组、分块转发，隔离单条失败
//! - 仅确认重复或转发成功的消息

pub mod context;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod state;
pub mod worker;

pub use context::DispatchContext;
pub use error::DispatchError;
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use pipeline::{BatchReport, DispatchPipeline, DELETE_BATCH_ERROR};
pub use state::{MessageFailure, MessageOutcome, MessageState};
pub use worker::{DispatchWorker, DEFAULT_IDLE_BACKOFF};
