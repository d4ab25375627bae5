//! 定位终端接入网关：设备 TCP 监听 + 任务/命令 HTTP API。

mod handlers;
mod middleware;
mod routes;
mod utils;

use std::sync::Arc;
use tracing::{info, warn};
use trk_config::{AppConfig, SinkKind};
use trk_control::{
    CommandRegistry, CommandService, CommandServiceConfig, CompletionReporter,
    HttpCompletionReporter, NoopReporter, TaskTable,
};
use trk_ingest::{ConnectionHandler, SessionDirectory, TcpSource, TcpSourceConfig, VendorRegistry};
use trk_pipeline::{MqttSink, MqttSinkConfig, NoopSink, ObserverSink, RetryConfig, RetryingSink};
use trk_telemetry::init_tracing;

#[derive(Clone)]
pub struct AppState {
    pub commands: CommandService,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 下游投递：noop / mqtt，外包有界重试
    let sink: Arc<dyn ObserverSink> = match config.sink {
        SinkKind::Noop => Arc::new(NoopSink),
        SinkKind::Mqtt => {
            let (sink, _eventloop) = MqttSink::connect(MqttSinkConfig {
                host: config.mqtt_host.clone(),
                port: config.mqtt_port,
                username: config.mqtt_username.clone(),
                password: config.mqtt_password.clone(),
                topic_prefix: config.mqtt_topic_prefix.clone(),
                qos: config.mqtt_qos,
            })?;
            Arc::new(sink)
        }
    };
    let sink: Arc<dyn ObserverSink> = Arc::new(RetryingSink::new(
        sink,
        RetryConfig {
            max_retries: config.sink_max_retries,
            backoff_ms: config.sink_backoff_ms,
        },
    ));

    // 命令：厂商工厂注册表 + 在线会话目录（下发）+ 完成回报
    let registry = Arc::new(CommandRegistry::with_builtin());
    let directory = SessionDirectory::new();
    let reporter: Arc<dyn CompletionReporter> = match &config.finish_url {
        Some(url) => Arc::new(HttpCompletionReporter::new(url.clone())),
        None => {
            warn!(target: "trk.gateway", "finish url not configured, format results are not reported");
            Arc::new(NoopReporter)
        }
    };
    let commands = CommandService::new(
        registry.clone(),
        Arc::new(TaskTable::with_capacity(config.task_capacity)),
        Arc::new(directory.clone()),
        reporter,
        CommandServiceConfig {
            public_host: config.public_host.clone(),
            public_port: config.public_port,
            report_timeout_ms: config.report_timeout_ms,
            report_max_retries: config.report_max_retries,
            report_backoff_ms: config.report_backoff_ms,
            dispatch_max_retries: config.dispatch_max_retries,
            dispatch_backoff_ms: config.dispatch_backoff_ms,
        },
    );

    // 设备 TCP 监听：按厂商选取接入驱动
    let driver = VendorRegistry::with_builtin(&registry).get(config.vendor)?;
    let source = TcpSource::new(
        TcpSourceConfig {
            listen_addr: config.listen_addr.clone(),
            idle_timeout_secs: config.idle_timeout_secs,
            ..TcpSourceConfig::default()
        },
        ConnectionHandler::new(driver, sink),
        directory,
    );
    let device_listener = source.bind().await?;
    tokio::spawn(async move {
        if let Err(err) = source.serve(device_listener).await {
            warn!(target: "trk.gateway", error = %err, "device_listener_stopped");
        }
    });

    let app = routes::create_router(AppState { commands });
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(
        target: "trk.gateway",
        http_addr = %config.http_addr,
        listen_addr = %config.listen_addr,
        vendor = %config.vendor,
        "gateway_started"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
