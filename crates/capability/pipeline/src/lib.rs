//! 下游投递：`store(events, replay)` 契约与实现。
//!
//! - `NoopSink`：丢弃（接线占位）
//! - `MemorySink`：内存记录（测试与调试）
//! - `MqttSink`：JSON 发布到 `<prefix>/<uid|unknown>`
//! - `RetryingSink`：任一 Sink 外包有界重试

mod mqtt;

pub use mqtt::{MqttSink, MqttSinkConfig, SinkEnvelope};

use async_trait::async_trait;
use domain::ObserverPacket;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

/// 投递错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("sink error: {0}")]
    Sink(String),
    #[error("payload error: {0}")]
    Payload(String),
}

/// 规范化事件投递抽象。
///
/// `replay` 为 Head 帧原始字节与数据帧原始字节的拼接，供审计/回放。
#[async_trait]
pub trait ObserverSink: Send + Sync {
    async fn store(&self, events: &[ObserverPacket], replay: &[u8]) -> Result<(), PipelineError>;
}

/// 空投递（用于占位）。
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl ObserverSink for NoopSink {
    async fn store(&self, _events: &[ObserverPacket], _replay: &[u8]) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// 一次 `store` 调用的记录。
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBatch {
    pub events: Vec<ObserverPacket>,
    pub replay: Vec<u8>,
}

/// 内存投递。
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<StoredBatch>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn batches(&self) -> Vec<StoredBatch> {
        self.batches.lock().await.clone()
    }
}

#[async_trait]
impl ObserverSink for MemorySink {
    async fn store(&self, events: &[ObserverPacket], replay: &[u8]) -> Result<(), PipelineError> {
        self.batches.lock().await.push(StoredBatch {
            events: events.to_vec(),
            replay: replay.to_vec(),
        });
        Ok(())
    }
}

/// 重试参数。
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryConfig {
    pub max_retries: u64,
    pub backoff_ms: u64,
}

/// 有界重试包装；重试耗尽后返回最后一次错误。
#[derive(Clone)]
pub struct RetryingSink {
    inner: Arc<dyn ObserverSink>,
    config: RetryConfig,
}

impl RetryingSink {
    pub fn new(inner: Arc<dyn ObserverSink>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl ObserverSink for RetryingSink {
    async fn store(&self, events: &[ObserverPacket], replay: &[u8]) -> Result<(), PipelineError> {
        let mut attempt = 0u64;
        loop {
            match self.inner.store(events, replay).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        return Err(err);
                    }
                    warn!(
                        target: "trk.pipeline",
                        attempt = attempt,
                        error = %err,
                        "sink_store_retry"
                    );
                    if self.config.backoff_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.backoff_ms)).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// 前 `failures` 次调用失败
    struct FlakySink {
        failures: u64,
        calls: AtomicU64,
    }

    #[async_trait]
    impl ObserverSink for FlakySink {
        async fn store(&self, _events: &[ObserverPacket], _replay: &[u8]) -> Result<(), PipelineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(PipelineError::Sink("forced failure".to_string()));
            }
            Ok(())
        }
    }

    fn flaky(failures: u64) -> Arc<FlakySink> {
        Arc::new(FlakySink {
            failures,
            calls: AtomicU64::new(0),
        })
    }

    #[tokio::test]
    async fn retrying_sink_recovers_within_budget() {
        let inner = flaky(2);
        let sink = RetryingSink::new(
            inner.clone(),
            RetryConfig {
                max_retries: 2,
                backoff_ms: 0,
            },
        );
        sink.store(&[], b"").await.expect("stored");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retrying_sink_gives_up_after_budget() {
        let inner = flaky(10);
        let sink = RetryingSink::new(
            inner.clone(),
            RetryConfig {
                max_retries: 1,
                backoff_ms: 0,
            },
        );
        let err = sink.store(&[], b"").await.expect_err("exhausted");
        assert_eq!(err.to_string(), "sink error: forced failure");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn memory_sink_keeps_replay_bytes() {
        let sink = MemorySink::new();
        sink.store(&[], &[0x12, 0x00, 0xAB]).await.expect("stored");
        let batches = sink.batches().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].replay, vec![0x12, 0x00, 0xAB]);
    }
}
