//! 在线会话目录：设备 uid → 连接的下行通道。

use async_trait::async_trait;
use bytes::Bytes;
use domain::Transport;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use trk_control::{Command, CommandDispatcher, ControlError};

/// 同一 uid 重连时，新连接覆盖旧连接的登记。
#[derive(Debug, Clone, Default)]
pub struct SessionDirectory {
    sessions: Arc<Mutex<HashMap<String, mpsc::Sender<Bytes>>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, uid: &str, outbound: mpsc::Sender<Bytes>) {
        self.sessions
            .lock()
            .await
            .insert(uid.to_string(), outbound);
        debug!(target: "trk.ingest", uid = %uid, "session_registered");
    }

    /// 只注销属于该通道的登记，避免旧连接关闭时误删新连接。
    pub async fn unregister(&self, uid: &str, outbound: &mpsc::Sender<Bytes>) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(uid)
            .is_some_and(|current| current.same_channel(outbound))
        {
            sessions.remove(uid);
            debug!(target: "trk.ingest", uid = %uid, "session_unregistered");
        }
    }

    pub async fn is_online(&self, uid: &str) -> bool {
        self.sessions.lock().await.contains_key(uid)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl CommandDispatcher for SessionDirectory {
    async fn dispatch(&self, uid: &str, command: &Command) -> Result<(), ControlError> {
        if command.transport == Transport::Sms {
            return Err(ControlError::Unsupported(
                "sms delivery is handled outside the gateway".to_string(),
            ));
        }
        let outbound = self
            .sessions
            .lock()
            .await
            .get(uid)
            .cloned()
            .ok_or_else(|| ControlError::NotConnected(uid.to_string()))?;
        for message in &command.messages {
            outbound
                .send(Bytes::from(message.clone()))
                .await
                .map_err(|_| ControlError::Dispatch(format!("connection of {} closed", uid)))?;
        }
        info!(
            target: "trk.ingest",
            uid = %uid,
            alias = %command.alias,
            messages = command.messages.len(),
            "command_queued"
        );
        Ok(())
    }
}
