//! 协议错误类型定义

/// 报文体解析错误（校验通过之后的结构错误）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// 报文体长度不足
    #[error("truncated payload: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    /// 报文体多余字节
    #[error("trailing bytes: {0}")]
    TrailingBytes(usize),

    /// 字段内容非法
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// 缺少必需字段
    #[error("missing field: {0}")]
    MissingField(String),

    /// 未知报文类型
    #[error("unknown sentence kind: {0}")]
    UnknownKind(String),
}

impl ProtocolError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
