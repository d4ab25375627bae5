//! 设备 TCP 监听
//!
//! 每个连接独立任务、独立会话；读事件与下行命令在同一循环中串行写入连接。

use crate::directory::SessionDirectory;
use crate::handler::{ConnectionHandler, FrameWriter};
use crate::session::Session;
use crate::IngestError;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{Instrument, error, info, info_span, warn};
use trk_telemetry::new_session_id;

const READ_CHUNK: usize = 4096;

/// TCP 监听配置
#[derive(Debug, Clone)]
pub struct TcpSourceConfig {
    pub listen_addr: String,
    /// 超过该时长无字节则关闭连接
    pub idle_timeout_secs: u64,
    /// 下行命令队列长度
    pub outbound_capacity: usize,
}

impl Default for TcpSourceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:21200".to_string(),
            idle_timeout_secs: 300,
            outbound_capacity: 16,
        }
    }
}

/// 设备 TCP 采集源
#[derive(Clone)]
pub struct TcpSource {
    config: TcpSourceConfig,
    handler: ConnectionHandler,
    directory: SessionDirectory,
}

impl TcpSource {
    pub fn new(config: TcpSourceConfig, handler: ConnectionHandler, directory: SessionDirectory) -> Self {
        Self {
            config,
            handler,
            directory,
        }
    }

    pub fn config(&self) -> &TcpSourceConfig {
        &self.config
    }

    pub async fn bind(&self) -> Result<TcpListener, IngestError> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|err| IngestError::Source(format!("{}: {}", self.config.listen_addr, err)))?;
        Ok(listener)
    }

    /// 接受连接直至监听器出错；单个连接的失败不影响其他连接。
    pub async fn serve(&self, listener: TcpListener) -> Result<(), IngestError> {
        info!(
            target: "trk.ingest",
            addr = ?listener.local_addr().ok(),
            vendor = %self.handler.driver().vendor(),
            "tcp_listening"
        );
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let source = self.clone();
                    let session = Session::new(new_session_id());
                    let span = info_span!(
                        "connection",
                        session_id = %session.id(),
                        peer = %peer,
                        vendor = %self.handler.driver().vendor()
                    );
                    tokio::spawn(
                        async move {
                            info!(target: "trk.ingest", "connection_opened");
                            if let Err(err) = source.handle_connection(stream, peer, session).await {
                                warn!(target: "trk.ingest", error = %err, "connection_error");
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(err) => {
                    error!(target: "trk.ingest", error = %err, "accept_failed");
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        mut session: Session,
    ) -> Result<(), IngestError> {
        let (mut reader, mut writer) = stream.into_split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel(self.config.outbound_capacity.max(1));
        let mut registered: Option<String> = None;

        let result = self
            .connection_loop(
                &mut reader,
                &mut writer,
                &mut session,
                &outbound_tx,
                &mut outbound_rx,
                &mut registered,
            )
            .await;

        if let Some(uid) = registered {
            self.directory.unregister(&uid, &outbound_tx).await;
        }
        info!(
            target: "trk.ingest",
            peer = %peer,
            uid = ?session.uid(),
            discarded = session.buffer().len(),
            "connection_closed"
        );
        result
    }

    async fn connection_loop(
        &self,
        reader: &mut OwnedReadHalf,
        writer: &mut OwnedWriteHalf,
        session: &mut Session,
        outbound_tx: &mpsc::Sender<Bytes>,
        outbound_rx: &mut mpsc::Receiver<Bytes>,
        registered: &mut Option<String>,
    ) -> Result<(), IngestError> {
        let idle = Duration::from_secs(self.config.idle_timeout_secs.max(1));
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            tokio::select! {
                read = tokio::time::timeout(idle, reader.read(&mut buf)) => {
                    let n = match read {
                        Ok(read) => read?,
                        Err(_) => {
                            info!(target: "trk.ingest", idle_secs = idle.as_secs(), "connection_idle_timeout");
                            return Ok(());
                        }
                    };
                    if n == 0 {
                        return Ok(());
                    }
                    self.handler.on_bytes(session, &buf[..n], writer).await?;
                    self.sync_registration(session, outbound_tx, registered).await;
                }
                Some(outbound) = outbound_rx.recv() => {
                    writer.write_frame(&outbound).await?;
                    info!(target: "trk.ingest", uid = ?session.uid(), len = outbound.len(), "command_written");
                }
            }
        }
    }

    /// 会话 uid 变化后更新在线目录。
    async fn sync_registration(
        &self,
        session: &Session,
        outbound_tx: &mpsc::Sender<Bytes>,
        registered: &mut Option<String>,
    ) {
        if session.uid() == registered.as_deref() {
            return;
        }
        if let Some(previous) = registered.take() {
            self.directory.unregister(&previous, outbound_tx).await;
        }
        if let Some(uid) = session.uid() {
            self.directory.register(uid, outbound_tx.clone()).await;
            *registered = Some(uid.to_string());
        }
    }
}
