//! # Load Balancer
//!
//! 负载感知的目标队列选择。
//!
//! ## 流程
//!
//! ```text
//! DepthOracle ──► LoadSampler (TTL 缓存) ──► WeightCalculator ──► QueueSelector
//! ```
//!
//! - 查询失败时沿用上次深度（无历史则为 0），不会中断批次
//! - 深度达到阈值的目标被排除
//! - 每条消息独立抽样，同一批次可分散到多个目标

mod router;
mod sampler;
mod selector;
mod weights;

pub use router::DestinationRouter;
pub use sampler::{DestinationLoad, LoadSampler, LoadSnapshot};
pub use selector::QueueSelector;
pub use weights::{calculate_weights, WeightCalculator, WeightTable};
