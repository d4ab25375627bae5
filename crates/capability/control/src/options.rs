//! 规范化配置项 ↔ 厂商选项码。

use domain::{ConfigOption, OptionSetting};
use std::collections::BTreeMap;

/// 规范化选项名 → 值
pub type CanonicalOptions = BTreeMap<String, String>;

/// 厂商选项码表；正反两个方向共用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionTable {
    entries: &'static [(ConfigOption, &'static str)],
}

pub const TR203_OPTIONS: OptionTable = OptionTable::new(&[
    (ConfigOption::FreqMov, "R1"),
    (ConfigOption::FreqIdle, "R0"),
    (ConfigOption::SendMov, "R3"),
]);

pub const TR600_OPTIONS: OptionTable = OptionTable::new(&[
    (ConfigOption::FreqMov, "Ri"),
    (ConfigOption::FreqIdle, "Ra"),
    (ConfigOption::SendMov, "Ro"),
    (ConfigOption::VoicePhone1, "V4"),
    (ConfigOption::VoicePhone2, "V8"),
    (ConfigOption::VoicePhone3, "V9"),
    (ConfigOption::VoiceCallOnSos, "V0"),
    (ConfigOption::SendByAngle, "S8"),
]);

impl OptionTable {
    pub const EMPTY: OptionTable = OptionTable::new(&[]);

    pub const fn new(entries: &'static [(ConfigOption, &'static str)]) -> Self {
        Self { entries }
    }

    pub fn code_for(&self, option: ConfigOption) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(known, _)| *known == option)
            .map(|(_, code)| *code)
    }

    pub fn option_for(&self, code: &str) -> Option<ConfigOption> {
        self.entries
            .iter()
            .find(|(_, known)| *known == code)
            .map(|(option, _)| *option)
    }

    pub fn supports(&self, option: ConfigOption) -> bool {
        self.code_for(option).is_some()
    }

    /// `base` + `,<code>=<value>`*，按输入顺序。
    pub fn append(&self, mut base: String, options: &[OptionSetting]) -> String {
        for setting in options {
            let Some(code) = ConfigOption::from_name(&setting.option)
                .and_then(|option| self.code_for(option))
            else {
                continue;
            };
            base.push(',');
            base.push_str(code);
            base.push('=');
            base.push_str(&setting.value);
        }
        base
    }

    /// 原始选项码 → 规范化选项名；未知码忽略。
    pub fn translate(&self, raw: &BTreeMap<String, String>) -> CanonicalOptions {
        raw.iter()
            .filter_map(|(code, value)| {
                self.option_for(code)
                    .map(|option| (option.as_str().to_string(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_skips_unsupported_and_unknown_names() {
        let options = vec![
            OptionSetting::new("freq_mov", "60"),
            OptionSetting::new("voice_phone_1", "+70000000000"),
            OptionSetting::new("no_such_option", "1"),
            OptionSetting::new("send_mov", "1"),
        ];
        assert_eq!(
            TR203_OPTIONS.append("GSS,1,3,0".to_string(), &options),
            "GSS,1,3,0,R1=60,R3=1"
        );
    }

    #[test]
    fn empty_table_leaves_base_untouched() {
        let options = vec![OptionSetting::new("freq_mov", "60")];
        assert_eq!(OptionTable::EMPTY.append("X".to_string(), &options), "X");
    }

    #[test]
    fn translate_ignores_unknown_codes() {
        let raw = BTreeMap::from([
            ("Ri".to_string(), "30".to_string()),
            ("S8".to_string(), "15".to_string()),
            ("Q9".to_string(), "x".to_string()),
        ]);
        let canonical = TR600_OPTIONS.translate(&raw);
        assert_eq!(canonical.len(), 2);
        assert_eq!(canonical.get("freq_mov").map(String::as_str), Some("30"));
        assert_eq!(canonical.get("send_by_angle").map(String::as_str), Some("15"));
    }
}
