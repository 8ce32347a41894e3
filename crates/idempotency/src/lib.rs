//! # Idempotency
//!
//! 基于原子 claim 的消息去重。
//!
//! - `claim` 返回 `true` 表示首次处理，`false` 表示重复
//! - 存储故障（连接、限流、损坏）作为致命错误向上传播，绝不当作任一结果
//! - 记录过期后重投递的消息可能被再次处理（保留窗口默认 7 天）

mod guard;
mod hash;
mod store;

pub use guard::{IdempotencyGuard, DEFAULT_RETENTION};
pub use hash::body_hash;
pub use store::{MemoryIdempotencyStore, SWEEP_INTERVAL};
