//! 单连接会话状态，由该连接的处理循环独占。

use bytes::{Bytes, BytesMut};
use trk_control::CanonicalOptions;
use uuid::Uuid;

/// 会话可观测状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 尚未得知设备标识
    NoHead,
    HeadKnown,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    uid: Option<String>,
    head_raw: Option<Bytes>,
    buffer: BytesMut,
    settings: Option<CanonicalOptions>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            uid: None,
            head_raw: None,
            buffer: BytesMut::new(),
            settings: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn state(&self) -> SessionState {
        match self.uid {
            Some(_) => SessionState::HeadKnown,
            None => SessionState::NoHead,
        }
    }

    pub fn head_raw(&self) -> Option<&Bytes> {
        self.head_raw.as_ref()
    }

    /// 未消费的累积字节
    pub fn buffer(&self) -> &BytesMut {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Head 帧：整体替换 uid 与 head 原始字节，返回被替换的旧 uid。
    pub fn accept_head(&mut self, uid: &str, raw: Bytes) -> Option<String> {
        self.head_raw = Some(raw);
        self.uid.replace(uid.to_string())
    }

    /// 数据帧自带的设备标识与会话不同时替换 uid；没有 head 字节可回放。
    /// 返回是否发生替换。
    pub fn adopt_inline_uid(&mut self, uid: &str) -> bool {
        if uid.is_empty() || self.uid.as_deref() == Some(uid) {
            return false;
        }
        self.uid = Some(uid.to_string());
        self.head_raw = None;
        true
    }

    /// 回放缓冲：head 原始字节（如有）+ 数据帧原始字节。
    pub fn replay_for(&self, frame: &[u8]) -> Vec<u8> {
        let head = self.head_raw.as_deref().unwrap_or_default();
        let mut replay = Vec::with_capacity(head.len() + frame.len());
        replay.extend_from_slice(head);
        replay.extend_from_slice(frame);
        replay
    }

    pub fn remember_settings(&mut self, settings: CanonicalOptions) {
        self.settings = Some(settings);
    }

    /// 最近一次配置回读（规范化选项名）
    pub fn last_settings(&self) -> Option<&CanonicalOptions> {
        self.settings.as_ref()
    }
}
