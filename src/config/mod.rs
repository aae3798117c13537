// ==========================================
// 仓储拣选编排系统 - 配置层
// ==========================================
// 职责: 系统配置的加载与查询
// ==========================================

pub mod settings_manager;

pub use settings_manager::SettingsManager;
