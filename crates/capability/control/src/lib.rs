//! 命令能力模块。
//!
//! - 厂商命令工厂：configure / execute / set-option 渲染
//! - 命令入口服务：format 回报、execute 下发、占位入口
//! - 任务关联表与完成回报

mod command;
mod dispatch;
mod factory;
mod options;
mod registry;
mod reporter;
mod service;
mod tasks;
mod vendors;

use domain::{CommandAlias, VendorId};

pub use command::{Command, CommandContext, CommandIntent};
pub use dispatch::{CommandDispatcher, NoopDispatcher};
pub use factory::{CommandFactory, VendorProfile, default_configure};
pub use options::{CanonicalOptions, OptionTable, TR203_OPTIONS, TR600_OPTIONS};
pub use registry::CommandRegistry;
pub use reporter::{CompletionReporter, HttpCompletionReporter, NoopReporter};
pub use service::{
    CommandOutcome, CommandService, CommandServiceConfig, TaskRequest, TaskTarget, resolve_ipv4,
};
pub use tasks::{DEFAULT_TASK_CAPACITY, TaskRecord, TaskStatus, TaskTable, TaskUpdate};
pub use vendors::{AutolinkCommands, GlobalsatCommands, NavisetCommands};

/// 控制链路错误。
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("vendor not registered: {0}")]
    NotRegistered(VendorId),
    #[error("payload error: {0}")]
    Payload(String),
    #[error("{0} requires device uid")]
    MissingUid(CommandAlias),
    #[error("resolve error: {0}")]
    Resolve(String),
    #[error("device not connected: {0}")]
    NotConnected(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("dispatch error: {0}")]
    Dispatch(String),
    #[error("report error: {0}")]
    Report(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("{0} is not implemented")]
    NotImplemented(CommandAlias),
}

impl ControlError {
    /// 只有写连接失败值得重试；设备离线/通道不支持重试也不会变。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ControlError::Dispatch(_) | ControlError::Report(_) | ControlError::Timeout(_)
        )
    }
}
