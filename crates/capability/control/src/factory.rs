//! 厂商命令能力集：默认实现 + 厂商按需覆盖。

use crate::command::{Command, CommandContext, CommandIntent};
use crate::options::{CanonicalOptions, OptionTable};
use crate::ControlError;
use domain::{CommandAlias, InitiationConfig, OptionSetting, Transport, VendorId};
use std::collections::BTreeMap;

/// 厂商不可变配置记录。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorProfile {
    pub vendor: VendorId,
    /// `false` 时 configure 前把域名解析为 IPv4
    pub host_name_supported: bool,
    /// 文本协议的报告格式串
    pub report_format: Option<&'static str>,
    /// 设备命令口令（命令串前缀，与传输方式无关）
    pub command_password: Option<&'static str>,
    pub options: OptionTable,
}

impl VendorProfile {
    pub const fn new(vendor: VendorId, options: OptionTable) -> Self {
        Self {
            vendor,
            host_name_supported: true,
            report_format: None,
            command_password: None,
            options,
        }
    }
}

/// 未覆盖 configure 的厂商使用的渲染：
/// tcp 合并为一条，sms 按设置项拆成两条。
pub fn default_configure(config: &InitiationConfig, transport: Transport) -> Vec<String> {
    let server = format!("SERVER,{},{}", config.host, config.port);
    let apn = format!(
        "APN,{},{},{}",
        config.apn, config.username, config.password
    );
    match transport {
        Transport::Tcp => vec![format!("{};{}", server, apn)],
        Transport::Sms => vec![server, apn],
    }
}

/// 厂商命令工厂。
pub trait CommandFactory: Send + Sync {
    fn profile(&self) -> &VendorProfile;

    fn configure(
        &self,
        config: &InitiationConfig,
        ctx: &CommandContext,
    ) -> Result<Vec<String>, ControlError> {
        Ok(default_configure(config, ctx.transport))
    }

    fn execute(&self, command: &str, _ctx: &CommandContext) -> Result<Vec<String>, ControlError> {
        Ok(vec![command.to_string()])
    }

    /// set-option 的基础命令串（选项片段追加其后）
    fn set_option_base(&self, _ctx: &CommandContext) -> Result<String, ControlError> {
        Ok(String::new())
    }

    /// 追加 `,<code>=<value>`；厂商不支持的选项静默跳过。
    fn add_command_set_options(&self, base: String, options: &[OptionSetting]) -> String {
        self.profile().options.append(base, options)
    }

    /// 设备回读的原始选项码 → 规范化选项名。
    fn translate_config_options(&self, raw: &BTreeMap<String, String>) -> CanonicalOptions {
        self.profile().options.translate(raw)
    }

    /// 最终下发前的整形（如追加校验尾）
    fn finish_set_option(&self, command: String) -> String {
        command
    }

    fn build(&self, intent: &CommandIntent, ctx: &CommandContext) -> Result<Command, ControlError> {
        let messages = match intent {
            CommandIntent::Configure(config) => self.configure(config, ctx)?,
            CommandIntent::Execute(command) => self.execute(command, ctx)?,
            CommandIntent::ReadSettings => {
                return Err(ControlError::NotImplemented(CommandAlias::ReadSettings));
            }
            CommandIntent::SetOption(options) => {
                let base = self.set_option_base(ctx)?;
                let command = self.add_command_set_options(base, options);
                vec![self.finish_set_option(command)]
            }
        };
        Ok(Command::new(intent.alias(), ctx.transport, messages))
    }
}
