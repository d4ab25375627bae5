//! 命令入口：外部任务系统按 alias 调用。

use crate::command::{CommandContext, CommandIntent};
use crate::dispatch::{CommandDispatcher, dispatch_with_retry};
use crate::factory::CommandFactory;
use crate::registry::CommandRegistry;
use crate::reporter::CompletionReporter;
use crate::tasks::{TaskStatus, TaskTable, TaskUpdate};
use crate::ControlError;
use domain::{CommandAlias, ConfigureRequest, OptionSetting, TaskId, Transport, VendorId};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use trk_telemetry::{
    record_command_built, record_command_dispatch_failure, record_command_dispatched,
    record_report_failure, record_report_sent,
};

/// 命令任务指向的设备。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTarget {
    pub task_id: TaskId,
    pub vendor: VendorId,
    pub uid: Option<String>,
    pub transport: Transport,
}

impl TaskTarget {
    fn context(&self) -> CommandContext {
        CommandContext::new(self.uid.clone(), self.transport)
    }
}

/// 一次命令任务。
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub target: TaskTarget,
    pub alias: CommandAlias,
    pub payload: serde_json::Value,
}

/// 命令入口的受理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// configure 结果已构建；`reported` 表示回报是否送达
    Formatted {
        messages: Vec<String>,
        result: String,
        reported: bool,
    },
    /// 已写入设备连接
    Dispatched { messages: Vec<String> },
    /// 入口为占位实现，任务标记为 deferred，未下发任何内容
    NotImplemented {
        alias: CommandAlias,
        prepared: Vec<String>,
    },
}

impl CommandOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandOutcome::Formatted { .. } => "formatted",
            CommandOutcome::Dispatched { .. } => "dispatched",
            CommandOutcome::NotImplemented { .. } => "not_implemented",
        }
    }

    pub fn messages(&self) -> &[String] {
        match self {
            CommandOutcome::Formatted { messages, .. } => messages,
            CommandOutcome::Dispatched { messages } => messages,
            CommandOutcome::NotImplemented { prepared, .. } => prepared,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandServiceConfig {
    /// configure 请求缺省 host 时写入的网关地址
    pub public_host: String,
    pub public_port: u16,
    pub report_timeout_ms: u64,
    pub report_max_retries: u64,
    pub report_backoff_ms: u64,
    pub dispatch_max_retries: u64,
    pub dispatch_backoff_ms: u64,
}

impl Default for CommandServiceConfig {
    fn default() -> Self {
        Self {
            public_host: "127.0.0.1".to_string(),
            public_port: 21200,
            report_timeout_ms: 5000,
            report_max_retries: 2,
            report_backoff_ms: 200,
            dispatch_max_retries: 0,
            dispatch_backoff_ms: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExecutePayload {
    Text(String),
    Object { command: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SetOptionPayload {
    List(Vec<OptionSetting>),
    Object { options: Vec<OptionSetting> },
}

/// 命令服务（构建 + 下发/回报 + 任务状态）。
#[derive(Clone)]
pub struct CommandService {
    registry: Arc<CommandRegistry>,
    tasks: Arc<TaskTable>,
    dispatcher: Arc<dyn CommandDispatcher>,
    reporter: Arc<dyn CompletionReporter>,
    config: CommandServiceConfig,
}

impl CommandService {
    pub fn new(
        registry: Arc<CommandRegistry>,
        tasks: Arc<TaskTable>,
        dispatcher: Arc<dyn CommandDispatcher>,
        reporter: Arc<dyn CompletionReporter>,
        config: CommandServiceConfig,
    ) -> Self {
        Self {
            registry,
            tasks,
            dispatcher,
            reporter,
            config,
        }
    }

    pub fn tasks(&self) -> &Arc<TaskTable> {
        &self.tasks
    }

    /// 按 alias 分派；payload 无法解析时任务记为 failed。
    pub async fn handle(&self, request: TaskRequest) -> Result<CommandOutcome, ControlError> {
        let target = &request.target;
        info!(
            target: "trk.control",
            task_id = %target.task_id,
            vendor = %target.vendor,
            uid = ?target.uid,
            alias = %request.alias,
            transport = %target.transport,
            "command_task_received"
        );
        match request.alias {
            CommandAlias::Configure => {
                let config = match parse_payload::<ConfigureRequest>(&request.payload) {
                    Ok(config) => config,
                    Err(err) => return Err(self.reject(target, request.alias, err).await),
                };
                self.format(target, &config).await
            }
            CommandAlias::Execute => match parse_payload::<ExecutePayload>(&request.payload) {
                Ok(ExecutePayload::Text(command) | ExecutePayload::Object { command }) => {
                    self.execute(target, &command).await
                }
                Err(err) => Err(self.reject(target, request.alias, err).await),
            },
            CommandAlias::ReadSettings => self.read_settings(target).await,
            CommandAlias::SetOption => {
                let options = match request.payload {
                    serde_json::Value::Null => Vec::new(),
                    ref payload => match parse_payload::<SetOptionPayload>(payload) {
                        Ok(SetOptionPayload::List(options) | SetOptionPayload::Object { options }) => {
                            options
                        }
                        Err(err) => return Err(self.reject(target, request.alias, err).await),
                    },
                };
                self.set_option(target, &options).await
            }
        }
    }

    /// 构建设备初始化命令包并回报给外部任务系统；不向设备发送。
    pub async fn format(
        &self,
        target: &TaskTarget,
        request: &ConfigureRequest,
    ) -> Result<CommandOutcome, ControlError> {
        self.tasks.begin(&target.task_id, CommandAlias::Configure).await;
        let command = match self.render_configure(target, request).await {
            Ok(command) => command,
            Err(err) => return Err(self.fail(&target.task_id, err).await),
        };
        let result = match command.format_result() {
            Ok(result) => result,
            Err(err) => return Err(self.fail(&target.task_id, err).await),
        };
        info!(
            target: "trk.control",
            task_id = %target.task_id,
            vendor = %target.vendor,
            messages = command.messages.len(),
            result = %result,
            "format_result_built"
        );

        let reported = match self.report_with_retry(&target.task_id, &result).await {
            Ok(()) => {
                record_report_sent();
                self.tasks
                    .transition(
                        &target.task_id,
                        TaskStatus::Completed,
                        TaskUpdate {
                            result: Some(result.clone()),
                            detail: None,
                        },
                    )
                    .await;
                true
            }
            Err(err) => {
                record_report_failure();
                warn!(
                    target: "trk.control",
                    task_id = %target.task_id,
                    error = %err,
                    "format_report_failed"
                );
                self.tasks
                    .transition(
                        &target.task_id,
                        TaskStatus::Failed,
                        TaskUpdate {
                            result: Some(result.clone()),
                            detail: Some(err.to_string()),
                        },
                    )
                    .await;
                false
            }
        };
        Ok(CommandOutcome::Formatted {
            messages: command.messages,
            result,
            reported,
        })
    }

    /// 原样转发命令串到设备。
    pub async fn execute(
        &self,
        target: &TaskTarget,
        command: &str,
    ) -> Result<CommandOutcome, ControlError> {
        self.tasks.begin(&target.task_id, CommandAlias::Execute).await;
        let ctx = target.context();
        let built = self
            .factory(target.vendor)
            .and_then(|factory| factory.build(&CommandIntent::Execute(command.to_string()), &ctx));
        let command = match built {
            Ok(command) => command,
            Err(err) => return Err(self.fail(&target.task_id, err).await),
        };
        record_command_built();
        let uid = match ctx.require_uid(CommandAlias::Execute) {
            Ok(uid) => uid,
            Err(err) => return Err(self.fail(&target.task_id, err).await),
        };

        match dispatch_with_retry(
            self.dispatcher.clone(),
            uid,
            &command,
            self.config.dispatch_max_retries,
            self.config.dispatch_backoff_ms,
        )
        .await
        {
            Ok(()) => {
                record_command_dispatched();
                info!(
                    target: "trk.control",
                    task_id = %target.task_id,
                    uid = %uid,
                    transport = %command.transport,
                    "command_dispatched"
                );
                self.tasks
                    .transition(&target.task_id, TaskStatus::Dispatched, TaskUpdate::default())
                    .await;
                Ok(CommandOutcome::Dispatched {
                    messages: command.messages,
                })
            }
            Err(err) => {
                record_command_dispatch_failure();
                Err(self.fail(&target.task_id, err).await)
            }
        }
    }

    /// 读取设备全部配置。
    ///
    /// 占位：回读协议尚未实现，任务标记为 deferred。
    /// 扩展点：下发厂商回读命令，由连接处理器收到 Settings 帧后完成任务。
    pub async fn read_settings(&self, target: &TaskTarget) -> Result<CommandOutcome, ControlError> {
        self.tasks.begin(&target.task_id, CommandAlias::ReadSettings).await;
        if let Err(err) = self.factory(target.vendor) {
            return Err(self.fail(&target.task_id, err).await);
        }
        self.defer(target, CommandAlias::ReadSettings, Vec::new()).await
    }

    /// 设置设备选项。
    ///
    /// 占位：命令会被构建并随结果返回，但不下发，任务标记为 deferred。
    /// 扩展点：读取回读结果后再按差异下发。
    pub async fn set_option(
        &self,
        target: &TaskTarget,
        options: &[OptionSetting],
    ) -> Result<CommandOutcome, ControlError> {
        self.tasks.begin(&target.task_id, CommandAlias::SetOption).await;
        let ctx = target.context();
        let built = self.factory(target.vendor).and_then(|factory| {
            factory.build(&CommandIntent::SetOption(options.to_vec()), &ctx)
        });
        let command = match built {
            Ok(command) => command,
            Err(err) => return Err(self.fail(&target.task_id, err).await),
        };
        record_command_built();
        self.defer(target, CommandAlias::SetOption, command.messages)
            .await
    }

    fn factory(&self, vendor: VendorId) -> Result<Arc<dyn CommandFactory>, ControlError> {
        self.registry.get(vendor)
    }

    async fn render_configure(
        &self,
        target: &TaskTarget,
        request: &ConfigureRequest,
    ) -> Result<crate::Command, ControlError> {
        let factory = self.factory(target.vendor)?;
        let mut config = request.resolve(&self.config.public_host, self.config.public_port);
        if !factory.profile().host_name_supported {
            config.host = resolve_ipv4(&config.host, config.port).await?;
        }
        let command = factory.build(&CommandIntent::Configure(config), &target.context())?;
        record_command_built();
        Ok(command)
    }

    async fn report_with_retry(&self, task_id: &TaskId, result: &str) -> Result<(), ControlError> {
        let timeout = Duration::from_millis(self.config.report_timeout_ms);
        let mut attempt = 0u64;
        loop {
            let outcome =
                match tokio::time::timeout(timeout, self.reporter.report(task_id, result)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ControlError::Timeout(self.config.report_timeout_ms)),
                };
            match outcome {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.config.report_max_retries {
                        return Err(err);
                    }
                    warn!(
                        target: "trk.control",
                        task_id = %task_id,
                        attempt = attempt,
                        error = %err,
                        "report_retry"
                    );
                    if self.config.report_backoff_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.report_backoff_ms))
                            .await;
                    }
                }
            }
        }
    }

    async fn defer(
        &self,
        target: &TaskTarget,
        alias: CommandAlias,
        prepared: Vec<String>,
    ) -> Result<CommandOutcome, ControlError> {
        info!(
            target: "trk.control",
            task_id = %target.task_id,
            alias = %alias,
            prepared = prepared.len(),
            "command_entry_not_implemented"
        );
        self.tasks
            .transition(
                &target.task_id,
                TaskStatus::Deferred,
                TaskUpdate {
                    result: None,
                    detail: Some(format!("{} is not implemented", alias)),
                },
            )
            .await;
        Ok(CommandOutcome::NotImplemented { alias, prepared })
    }

    async fn fail(&self, task_id: &TaskId, err: ControlError) -> ControlError {
        warn!(target: "trk.control", task_id = %task_id, error = %err, "command_task_failed");
        self.tasks
            .transition(
                task_id,
                TaskStatus::Failed,
                TaskUpdate {
                    result: None,
                    detail: Some(err.to_string()),
                },
            )
            .await;
        err
    }

    async fn reject(&self, target: &TaskTarget, alias: CommandAlias, err: ControlError) -> ControlError {
        self.tasks.begin(&target.task_id, alias).await;
        self.fail(&target.task_id, err).await
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    payload: &serde_json::Value,
) -> Result<T, ControlError> {
    // configure 允许以 JSON 字符串形式整体下发
    let decoded = match payload {
        serde_json::Value::String(text) if text.trim_start().starts_with(['{', '[']) => {
            serde_json::from_str(text)
        }
        other => serde_json::from_value(other.clone()),
    };
    decoded.map_err(|err| ControlError::Payload(err.to_string()))
}

/// 域名 → IPv4 字面量；已是 IPv4 时原样返回。
pub async fn resolve_ipv4(host: &str, port: u16) -> Result<String, ControlError> {
    if host.parse::<Ipv4Addr>().is_ok() {
        return Ok(host.to_string());
    }
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|err| ControlError::Resolve(format!("{}: {}", host, err)))?;
    addrs
        .filter(|addr| addr.is_ipv4())
        .map(|addr| addr.ip().to_string())
        .next()
        .ok_or_else(|| ControlError::Resolve(format!("{}: no ipv4 address", host)))
}
