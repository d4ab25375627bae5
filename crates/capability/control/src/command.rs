use crate::ControlError;
use domain::{CommandAlias, InitiationConfig, OptionSetting, Transport};
use serde::Serialize;

/// 已渲染的厂商命令；`messages` 顺序即下发顺序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub alias: CommandAlias,
    pub transport: Transport,
    pub messages: Vec<String>,
}

#[derive(Serialize)]
struct FormatResult<'a> {
    list: &'a [String],
}

impl Command {
    pub fn new(alias: CommandAlias, transport: Transport, messages: Vec<String>) -> Self {
        Self {
            alias,
            transport,
            messages,
        }
    }

    /// 完成回报的 `result` 字段：`{"list":[...]}`。
    pub fn format_result(&self) -> Result<String, ControlError> {
        serde_json::to_string(&FormatResult {
            list: &self.messages,
        })
        .map_err(|err| ControlError::Payload(err.to_string()))
    }
}

/// 命令意图（封闭集合）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandIntent {
    Configure(InitiationConfig),
    Execute(String),
    ReadSettings,
    SetOption(Vec<OptionSetting>),
}

impl CommandIntent {
    pub fn alias(&self) -> CommandAlias {
        match self {
            CommandIntent::Configure(_) => CommandAlias::Configure,
            CommandIntent::Execute(_) => CommandAlias::Execute,
            CommandIntent::ReadSettings => CommandAlias::ReadSettings,
            CommandIntent::SetOption(_) => CommandAlias::SetOption,
        }
    }
}

/// 构建命令所需的目标设备上下文。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandContext {
    pub uid: Option<String>,
    pub transport: Transport,
}

impl CommandContext {
    pub fn new(uid: Option<String>, transport: Transport) -> Self {
        Self { uid, transport }
    }

    pub(crate) fn require_uid(&self, alias: CommandAlias) -> Result<&str, ControlError> {
        self.uid
            .as_deref()
            .filter(|uid| !uid.is_empty())
            .ok_or(ControlError::MissingUid(alias))
    }
}
