use crate::factory::CommandFactory;
use crate::vendors::{AutolinkCommands, GlobalsatCommands, NavisetCommands};
use crate::ControlError;
use domain::VendorId;
use std::collections::HashMap;
use std::sync::Arc;

/// 厂商标识 → 命令工厂。
#[derive(Clone, Default)]
pub struct CommandRegistry {
    factories: HashMap<VendorId, Arc<dyn CommandFactory>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部内置厂商。
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(VendorId::Naviset, Arc::new(NavisetCommands::new()));
        registry.register(VendorId::GlobalsatTr203, Arc::new(GlobalsatCommands::tr203()));
        registry.register(VendorId::GlobalsatTr600, Arc::new(GlobalsatCommands::tr600()));
        registry.register(VendorId::Autolink, Arc::new(AutolinkCommands::new()));
        registry
    }

    pub fn register(&mut self, vendor: VendorId, factory: Arc<dyn CommandFactory>) {
        self.factories.insert(vendor, factory);
    }

    pub fn get(&self, vendor: VendorId) -> Result<Arc<dyn CommandFactory>, ControlError> {
        self.factories
            .get(&vendor)
            .cloned()
            .ok_or(ControlError::NotRegistered(vendor))
    }
}
