//! 单条消息在批次中的状态机
//!
//! ```text
//! Received → Validated → Claimed → Selected → Forwarded → Acknowledged
//!               │            │          │           │
//!               ▼            ▼          ▼           ▼
//!             Failed     Duplicate    Failed      Failed
//!                            │
//!                            ▼
//!                      Acknowledged
//! ```

use std::fmt;

use contracts::{AckToken, DestinationId, InboundMessage};

/// 消息状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageState {
    Received,
    Validated,
    Claimed,
    Duplicate,
    Selected,
    Forwarded,
    Acknowledged,
    Failed,
}

impl MessageState {
    /// 是否应从入口队列删除
    pub fn should_acknowledge(self) -> bool {
        matches!(self, Self::Duplicate | Self::Forwarded)
    }
}

/// 失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageFailure {
    /// 信封无效（缺少或非法的 request_id）
    Validation(String),
    /// 没有可用目标队列
    NoDestination(String),
    /// 转发失败
    Forward { code: String, message: String },
    /// 删除失败（消息已转发或是重复，将被重新投递并被幂等性拦截）
    Ack { code: String, message: String },
}

impl fmt::Display for MessageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation: {message}"),
            Self::NoDestination(message) => write!(f, "no destination: {message}"),
            Self::Forward { code, message } => write!(f, "forward [{code}]: {message}"),
            Self::Ack { code, message } => write!(f, "ack [{code}]: {message}"),
        }
    }
}

/// 单条消息的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    /// 批次内位置（也是发送给 sink 的条目 id）
    pub position: usize,
    /// 解析出的 request_id
    pub request_id: Option<String>,
    pub state: MessageState,
    /// 选中的目标队列
    pub destination: Option<DestinationId>,
    /// 是否为重复消息
    pub duplicate: bool,
    pub failure: Option<MessageFailure>,
}

impl MessageOutcome {
    pub fn is_acknowledged(&self) -> bool {
        self.state == MessageState::Acknowledged
    }
}

/// 批次处理中的消息
#[derive(Debug)]
pub(crate) struct Tracked {
    pub position: usize,
    pub message: InboundMessage,
    pub request_id: Option<String>,
    pub state: MessageState,
    pub destination: Option<DestinationId>,
    pub duplicate: bool,
    pub failure: Option<MessageFailure>,
}

impl Tracked {
    pub fn new(position: usize, message: InboundMessage) -> Self {
        Self {
            position,
            message,
            request_id: None,
            state: MessageState::Received,
            destination: None,
            duplicate: false,
            failure: None,
        }
    }

    /// 条目 id
    pub fn entry_id(&self) -> String {
        self.position.to_string()
    }

    pub fn ack(&self) -> &AckToken {
        &self.message.ack
    }

    pub fn fail(&mut self, failure: MessageFailure) {
        self.state = MessageState::Failed;
        self.failure = Some(failure);
    }

    pub fn into_outcome(self) -> MessageOutcome {
        MessageOutcome {
            position: self.position,
            request_id: self.request_id,
            state: self.state,
            destination: self.destination,
            duplicate: self.duplicate,
            failure: self.failure,
        }
    }
}
