// ==========================================
// 仓储拣选编排系统 - 订单领域模型
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Order
// ==========================================

use crate::domain::types::{ItemType, OrderCategory, OrderStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 订单
// ==========================================
// 订单在发货前归拣选子系统所有:
// 分类引擎回写 category,分配引擎回写 chunk_id/bin_number,
// 生命周期引擎负责状态迁移与解绑
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,              // 订单ID
    pub order_number: String,          // 订单号(面向人的编号)
    pub status: OrderStatus,           // 主状态
    pub personalized: bool,            // 个性化(刻字)标记
    pub category: Option<OrderCategory>, // 分类结果(未分类为 None)
    pub batch_id: Option<String>,      // 所属批次
    pub bulk_batch_id: Option<String>, // 所属批量子批
    pub chunk_id: Option<String>,      // 当前占用的 chunk(至多一个)
    pub bin_number: Option<i32>,       // 车上格位号
    pub created_at: NaiveDateTime,     // 创建时间
    pub updated_at: NaiveDateTime,     // 更新时间
}

impl Order {
    /// 判断是否可被领取(未绑 chunk 且待拣选)
    pub fn is_claimable(&self) -> bool {
        self.chunk_id.is_none() && self.status == OrderStatus::AwaitingShipment
    }
}

// ==========================================
// OrderItem - 订单行
// ==========================================
// 入库时已归一化: SKU 大写去空白,行类型打标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: String,        // 所属订单
    pub line_no: i32,            // 行号
    pub sku: String,             // SKU
    pub item_name: Option<String>, // 品名
    pub quantity: i32,           // 数量
    pub item_type: ItemType,     // 行类型
}

impl OrderItem {
    /// 判断是否为实物行(签名/落格只统计实物)
    pub fn is_physical(&self) -> bool {
        self.item_type == ItemType::Physical
    }
}
