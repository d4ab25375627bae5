use crate::command::Command;
use crate::ControlError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// 命令下发器抽象（设备连接或短信网关）。
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn dispatch(&self, uid: &str, command: &Command) -> Result<(), ControlError>;
}

/// 空下发器（用于占位）。
#[derive(Debug, Default)]
pub struct NoopDispatcher;

#[async_trait]
impl CommandDispatcher for NoopDispatcher {
    async fn dispatch(&self, _uid: &str, _command: &Command) -> Result<(), ControlError> {
        Ok(())
    }
}

pub(crate) async fn dispatch_with_retry(
    dispatcher: Arc<dyn CommandDispatcher>,
    uid: &str,
    command: &Command,
    max_retries: u64,
    backoff_ms: u64,
) -> Result<(), ControlError> {
    let mut attempt = 0u64;
    loop {
        match dispatcher.dispatch(uid, command).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                attempt += 1;
                if attempt > max_retries || !err.is_retryable() {
                    return Err(err);
                }
                if backoff_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}
