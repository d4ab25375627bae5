//! 接入能力模块。
//!
//! ```text
//! TcpSource ──accept──► 连接任务（独占 Session）
//!                          │ read
//!                          ▼
//!                  ConnectionHandler::on_bytes
//!                  extract → ack → Head/Data/Settings → translate → ObserverSink
//!                          ▲
//!   SessionDirectory ──────┘ 下行命令（execute）经连接的 mpsc 通道写出
//! ```
//!
//! 尚未收到 Head 的数据帧照常翻译并投递，`uid` 为空，同时告警计数。

mod directory;
mod handler;
mod session;
mod tcp;
mod vendor;

pub use directory::SessionDirectory;
pub use handler::{ConnectionHandler, FrameWriter, ReadSummary};
pub use session::{Session, SessionState};
pub use tcp::{TcpSource, TcpSourceConfig};
pub use vendor::{VendorDriver, VendorRegistry};

use domain::VendorId;

/// 接入错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("vendor has no ingest protocol: {0}")]
    UnsupportedVendor(VendorId),
    #[error("source error: {0}")]
    Source(String),
}
