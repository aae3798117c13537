// ==========================================
// 仓储拣选编排系统 - 批次领域模型
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Batch, BulkBatch, Cell
// ==========================================

use crate::domain::types::{BatchStatus, BatchType, BulkBatchStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Batch - 订单批次
// ==========================================
// 一次释放的订单池,按 priority 被分配引擎挑选;
// personalized 批次不绑拣选区,oversized 批次限制 6 格车
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,          // 批次ID
    pub batch_name: String,        // 批次名称
    pub batch_type: BatchType,     // 批次类型
    pub priority: i32,             // 优先级(大者优先)
    pub status: BatchStatus,       // 状态
    pub personalized: bool,        // 个性化池标记(不绑 cell)
    pub oversized: bool,           // 大件标记(6 格车)
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

// ==========================================
// SkuLayoutEntry - 批量货架格位布局项
// ==========================================
// 一个数量单位占一格;同一子批内所有格位 bin_qty 相同
// (子批内订单同构,依据 Picking_Engine_Specs 4.3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuLayoutEntry {
    pub sku: String,    // SKU
    pub bin_qty: i32,   // 该格应放件数(= 子批订单数)
    pub bin_index: i32, // 货架内格位序号(1 起)
}

// ==========================================
// BulkBatch - 批量子批
// ==========================================
// 同一签名订单群按容量(默认 24)切分的子批,
// 领取时以"货架"为单位整批上车
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkBatch {
    pub bulk_batch_id: String,        // 子批ID
    pub batch_id: String,             // 所属批次
    pub signature: String,            // 订单组成签名
    pub split_index: i32,             // 切分序号(0 起,领取按此排序)
    pub order_count: i32,             // 子批订单数
    pub sku_layout: Vec<SkuLayoutEntry>, // 格位布局
    pub status: BulkBatchStatus,      // 状态
    pub created_at: NaiveDateTime,    // 创建时间
}

impl BulkBatch {
    /// 序列化格位布局为 JSON 字符串(入库用)
    pub fn sku_layout_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.sku_layout)
    }

    /// 从 JSON 字符串解析格位布局
    pub fn parse_sku_layout(json: &str) -> serde_json::Result<Vec<SkuLayoutEntry>> {
        serde_json::from_str(json)
    }
}

// ==========================================
// Cell - 拣选区
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub cell_id: String,   // 拣选区ID
    pub cell_name: String, // 拣选区名称
    pub is_active: bool,   // 是否启用
}

// ==========================================
// BatchCellAssignment - 批次与拣选区的路由
// ==========================================
// 分配引擎按 priority 升序扫描该表选批次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCellAssignment {
    pub batch_id: String, // 批次ID
    pub cell_id: String,  // 拣选区ID
    pub priority: i32,    // 路由优先级(小者先)
}
