//! 厂商驱动注册表：厂商标识 → 分帧器 + 翻译器 + 命令工厂。

use crate::IngestError;
use domain::VendorId;
use std::collections::HashMap;
use std::sync::Arc;
use trk_control::{CommandFactory, CommandRegistry};
use trk_normalize::Translator;
use trk_protocol::{GlobalsatFactory, NavisetFactory, PacketFactory};

/// 单厂商的接入能力集。
#[derive(Clone)]
pub struct VendorDriver {
    vendor: VendorId,
    codec: Arc<dyn PacketFactory>,
    translator: Translator,
    commands: Arc<dyn CommandFactory>,
}

impl VendorDriver {
    pub fn new(
        vendor: VendorId,
        codec: Arc<dyn PacketFactory>,
        translator: Translator,
        commands: Arc<dyn CommandFactory>,
    ) -> Self {
        Self {
            vendor,
            codec,
            translator,
            commands,
        }
    }

    /// 按厂商配置记录组装；没有接入协议的厂商（仅命令）返回错误。
    pub fn for_vendor(vendor: VendorId, registry: &CommandRegistry) -> Result<Self, IngestError> {
        let commands = registry
            .get(vendor)
            .map_err(|err| IngestError::Source(err.to_string()))?;
        let profile = *commands.profile();
        let codec: Arc<dyn PacketFactory> = match vendor {
            VendorId::Naviset => Arc::new(NavisetFactory::new()),
            VendorId::GlobalsatTr203 | VendorId::GlobalsatTr600 => {
                let format = profile
                    .report_format
                    .ok_or(IngestError::UnsupportedVendor(vendor))?;
                Arc::new(GlobalsatFactory::new(format))
            }
            VendorId::Autolink => return Err(IngestError::UnsupportedVendor(vendor)),
        };
        Ok(Self::new(
            vendor,
            codec,
            Translator::for_vendor(vendor),
            commands,
        ))
    }

    pub fn vendor(&self) -> VendorId {
        self.vendor
    }

    pub fn codec(&self) -> &dyn PacketFactory {
        self.codec.as_ref()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn commands(&self) -> &dyn CommandFactory {
        self.commands.as_ref()
    }
}

#[derive(Clone, Default)]
pub struct VendorRegistry {
    drivers: HashMap<VendorId, Arc<VendorDriver>>,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册所有具备接入协议的内置厂商。
    pub fn with_builtin(commands: &CommandRegistry) -> Self {
        let mut registry = Self::new();
        for vendor in VendorId::ALL {
            if let Ok(driver) = VendorDriver::for_vendor(vendor, commands) {
                registry.register(driver);
            }
        }
        registry
    }

    pub fn register(&mut self, driver: VendorDriver) {
        self.drivers.insert(driver.vendor(), Arc::new(driver));
    }

    pub fn get(&self, vendor: VendorId) -> Result<Arc<VendorDriver>, IngestError> {
        self.drivers
            .get(&vendor)
            .cloned()
            .ok_or(IngestError::UnsupportedVendor(vendor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_drivers_follow_vendor_profiles() {
        let registry = VendorRegistry::with_builtin(&CommandRegistry::with_builtin());
        assert_eq!(
            registry.get(VendorId::Naviset).expect("naviset").codec().family(),
            "naviset"
        );
        assert_eq!(
            registry
                .get(VendorId::GlobalsatTr600)
                .expect("tr600")
                .codec()
                .family(),
            "globalsat"
        );
        assert!(matches!(
            registry.get(VendorId::Autolink).err(),
            Some(IngestError::UnsupportedVendor(VendorId::Autolink))
        ));
    }
}
