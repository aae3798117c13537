// ==========================================
// 仓储拣选编排系统 - API 层
// ==========================================
// 输入校验 + 引擎编排 + 错误转换, 不直接写 SQL
// ==========================================

pub mod error;
pub mod order_api;
pub mod picking_api;
pub mod settings_api;

pub use error::{ApiError, ApiResult};
pub use order_api::{IngestSummary, OrderApi, ReclassifySummary};
pub use picking_api::{
    ChunkDetail, ClaimChunkRequest, EngravingCheckpointRequest, PickingApi, ShelfDetail,
};
pub use settings_api::SettingsApi;
