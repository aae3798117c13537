// ==========================================
// 仓储拣选编排系统 - 领域模型层
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod cart;
pub mod chunk;
pub mod order;
pub mod types;

// 重导出核心类型
pub use batch::{Batch, BatchCellAssignment, BulkBatch, Cell, SkuLayoutEntry};
pub use cart::Cart;
pub use chunk::{Chunk, ChunkBulkBatchAssignment, EngravingProgress};
pub use order::{Order, OrderItem};
pub use types::{
    BatchStatus, BatchType, BulkBatchStatus, CartStatus, ChunkStatus, ItemType, OrderCategory,
    OrderStatus, PickingMode,
};
