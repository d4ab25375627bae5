//! 内置厂商命令工厂。

use crate::command::CommandContext;
use crate::factory::{CommandFactory, VendorProfile, default_configure};
use crate::options::{OptionTable, TR203_OPTIONS, TR600_OPTIONS};
use crate::ControlError;
use domain::{CommandAlias, InitiationConfig, Transport, VendorId};
use trk_protocol::globalsat::{TR203_REPORT_FORMAT, TR600_REPORT_FORMAT, seal};

/// Naviset：tcp/sms 均为 COM3 + COM13 两条。
#[derive(Debug, Clone)]
pub struct NavisetCommands {
    profile: VendorProfile,
}

impl NavisetCommands {
    pub const PASSWORD: &'static str = "1234";

    pub fn new() -> Self {
        Self::with_profile(VendorProfile {
            command_password: Some(Self::PASSWORD),
            ..VendorProfile::new(VendorId::Naviset, OptionTable::EMPTY)
        })
    }

    pub fn with_profile(profile: VendorProfile) -> Self {
        Self { profile }
    }
}

impl Default for NavisetCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for NavisetCommands {
    fn profile(&self) -> &VendorProfile {
        &self.profile
    }

    fn configure(
        &self,
        config: &InitiationConfig,
        _ctx: &CommandContext,
    ) -> Result<Vec<String>, ControlError> {
        let password = self.profile.command_password.unwrap_or(Self::PASSWORD);
        Ok(vec![
            format!("COM3 {},{},{}", password, config.host, config.port),
            format!(
                "COM13 {},1,{},{},{}#",
                password, config.apn, config.username, config.password
            ),
        ])
    }
}

/// Autolink：只覆盖 sms 渲染，tcp 走默认。
#[derive(Debug, Clone)]
pub struct AutolinkCommands {
    profile: VendorProfile,
}

impl AutolinkCommands {
    pub const PASSWORD: &'static str = "123456";

    pub fn new() -> Self {
        Self {
            profile: VendorProfile {
                command_password: Some(Self::PASSWORD),
                ..VendorProfile::new(VendorId::Autolink, OptionTable::EMPTY)
            },
        }
    }
}

impl Default for AutolinkCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for AutolinkCommands {
    fn profile(&self) -> &VendorProfile {
        &self.profile
    }

    fn configure(
        &self,
        config: &InitiationConfig,
        ctx: &CommandContext,
    ) -> Result<Vec<String>, ControlError> {
        if ctx.transport != Transport::Sms {
            return Ok(default_configure(config, ctx.transport));
        }
        let password = self.profile.command_password.unwrap_or(Self::PASSWORD);
        Ok(vec![
            format!("{}*WCAS*{};{}", password, config.host, config.port),
            format!(
                "{}*APNI*{};{};{}",
                password, config.apn, config.username, config.password
            ),
        ])
    }
}

/// Globalsat TR-203 / TR-600：`GSS` 命令，带 `*XX!` 校验尾。
#[derive(Debug, Clone)]
pub struct GlobalsatCommands {
    profile: VendorProfile,
}

impl GlobalsatCommands {
    pub fn tr203() -> Self {
        Self::with_profile(VendorProfile {
            report_format: Some(TR203_REPORT_FORMAT),
            ..VendorProfile::new(VendorId::GlobalsatTr203, TR203_OPTIONS)
        })
    }

    pub fn tr600() -> Self {
        Self::with_profile(VendorProfile {
            report_format: Some(TR600_REPORT_FORMAT),
            ..VendorProfile::new(VendorId::GlobalsatTr600, TR600_OPTIONS)
        })
    }

    pub fn with_profile(profile: VendorProfile) -> Self {
        Self { profile }
    }

    fn base(uid: &str) -> String {
        format!("GSS,{},3,0", uid)
    }
}

impl CommandFactory for GlobalsatCommands {
    fn profile(&self) -> &VendorProfile {
        &self.profile
    }

    fn configure(
        &self,
        config: &InitiationConfig,
        ctx: &CommandContext,
    ) -> Result<Vec<String>, ControlError> {
        let uid = ctx.require_uid(CommandAlias::Configure)?;
        let body = format!(
            "{},D1={},D2={},D3={},E0={},E1={},O3={}",
            Self::base(uid),
            config.apn,
            config.username,
            config.password,
            config.host,
            config.port,
            self.profile.report_format.unwrap_or_default()
        );
        Ok(vec![seal(&body)])
    }

    fn set_option_base(&self, ctx: &CommandContext) -> Result<String, ControlError> {
        Ok(Self::base(ctx.require_uid(CommandAlias::SetOption)?))
    }

    fn finish_set_option(&self, command: String) -> String {
        seal(&command)
    }
}
