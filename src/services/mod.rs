// ==========================================
// 仓储拣选编排系统 - 外部协作者服务层
// ==========================================
// Engine 层定义接口, 本层提供具体实现
// ==========================================

pub mod label_prepurchase;
pub mod location_resolver;

pub use label_prepurchase::{run_label_worker, LabelPrepurchaseQueue};
pub use location_resolver::SqliteLocationResolver;
