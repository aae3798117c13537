// ==========================================
// 仓储拣选编排系统 - 领域类型定义
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 订单从入库到出库的主状态机,拣选子系统只在
// AWAITING_SHIPMENT / ASSIGNED / PICKED 之间迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,          // 已入库,未释放
    AwaitingShipment, // 待拣选
    Assigned,         // 已分派到 chunk
    Picked,           // 拣选完成
    Shipped,          // 已发货(终态)
    Cancelled,        // 已取消(终态)
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl OrderStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PENDING" => OrderStatus::Pending,
            "AWAITING_SHIPMENT" => OrderStatus::AwaitingShipment,
            "ASSIGNED" => OrderStatus::Assigned,
            "PICKED" => OrderStatus::Picked,
            "SHIPPED" => OrderStatus::Shipped,
            "CANCELLED" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::AwaitingShipment => "AWAITING_SHIPMENT",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::Picked => "PICKED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 订单分类 (Order Category)
// ==========================================
// 依据: Picking_Engine_Specs 4.2 分类优先级
// 红线: PERSONALIZED > SINGLE > BULK > ORDER_BY_SIZE,
//       SINGLE 是终态分类,不因重复数升级为 BULK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCategory {
    Single,       // 单品单件
    Personalized, // 个性化(刻字)
    Bulk,         // 同构批量
    OrderBySize,  // 默认(按体量排序)
}

impl fmt::Display for OrderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl OrderCategory {
    /// 从字符串解析分类
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SINGLE" => Some(OrderCategory::Single),
            "PERSONALIZED" => Some(OrderCategory::Personalized),
            "BULK" => Some(OrderCategory::Bulk),
            "ORDER_BY_SIZE" => Some(OrderCategory::OrderBySize),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderCategory::Single => "SINGLE",
            OrderCategory::Personalized => "PERSONALIZED",
            OrderCategory::Bulk => "BULK",
            OrderCategory::OrderBySize => "ORDER_BY_SIZE",
        }
    }
}

// ==========================================
// 订单行类型 (Order Item Type)
// ==========================================
// 入库时归一化;签名计算只统计 PHYSICAL 行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Physical,  // 实物
    Insurance, // 运费险/保价
    Shipping,  // 运费附加项
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl ItemType {
    /// 从字符串解析行类型
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "INSURANCE" => ItemType::Insurance,
            "SHIPPING" => ItemType::Shipping,
            _ => ItemType::Physical, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ItemType::Physical => "PHYSICAL",
            ItemType::Insurance => "INSURANCE",
            ItemType::Shipping => "SHIPPING",
        }
    }
}

// ==========================================
// 批次类型 (Batch Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchType {
    Singles, // 单品批次
    Bulk,    // 批量批次
    Default, // 默认批次
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl BatchType {
    /// 从字符串解析批次类型
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "SINGLES" => BatchType::Singles,
            "BULK" => BatchType::Bulk,
            _ => BatchType::Default,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchType::Singles => "SINGLES",
            BatchType::Bulk => "BULK",
            BatchType::Default => "DEFAULT",
        }
    }
}

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Active,     // 已释放,可领取
    InProgress, // 已产生首个 chunk
    Released,   // 拣选完毕,待收尾
    Closed,     // 关闭(终态)
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl BatchStatus {
    /// 从字符串解析批次状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IN_PROGRESS" => BatchStatus::InProgress,
            "RELEASED" => BatchStatus::Released,
            "CLOSED" => BatchStatus::Closed,
            _ => BatchStatus::Active,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "ACTIVE",
            BatchStatus::InProgress => "IN_PROGRESS",
            BatchStatus::Released => "RELEASED",
            BatchStatus::Closed => "CLOSED",
        }
    }
}

// ==========================================
// 批量子批状态 (Bulk Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkBatchStatus {
    Pending,  // 待领取
    Assigned, // 已绑定到 chunk 货架
}

impl fmt::Display for BulkBatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl BulkBatchStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ASSIGNED" => BulkBatchStatus::Assigned,
            _ => BulkBatchStatus::Pending,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BulkBatchStatus::Pending => "PENDING",
            BulkBatchStatus::Assigned => "ASSIGNED",
        }
    }
}

// ==========================================
// 拣选模式 (Picking Mode)
// ==========================================
// 决定 chunk 的取单与落格策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickingMode {
    Singles,     // 按 SKU 聚合,一格一 SKU
    Bulk,        // 按货架领取批量子批
    OrderBySize, // 一格一单
}

impl fmt::Display for PickingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl PickingMode {
    /// 从字符串解析拣选模式
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "SINGLES" => PickingMode::Singles,
            "BULK" => PickingMode::Bulk,
            _ => PickingMode::OrderBySize,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PickingMode::Singles => "SINGLES",
            PickingMode::Bulk => "BULK",
            PickingMode::OrderBySize => "ORDER_BY_SIZE",
        }
    }
}

// ==========================================
// Chunk 状态 (Chunk Status)
// ==========================================
// 依据: Picking_Engine_Specs 4.6 生命周期状态机
// PICKING -> PICKED | READY_FOR_ENGRAVING -> ENGRAVING -> READY_FOR_SHIPPING
// CANCELLED 仅可从 PICKING / PICKED 到达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkStatus {
    Picking,           // 拣选中
    Picked,            // 拣选完成(标准链路终态)
    ReadyForEngraving, // 待刻字
    Engraving,         // 刻字中
    ReadyForShipping,  // 待发货(个性化链路终态)
    Cancelled,         // 已取消
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl ChunkStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PICKED" => ChunkStatus::Picked,
            "READY_FOR_ENGRAVING" => ChunkStatus::ReadyForEngraving,
            "ENGRAVING" => ChunkStatus::Engraving,
            "READY_FOR_SHIPPING" => ChunkStatus::ReadyForShipping,
            "CANCELLED" => ChunkStatus::Cancelled,
            _ => ChunkStatus::Picking,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChunkStatus::Picking => "PICKING",
            ChunkStatus::Picked => "PICKED",
            ChunkStatus::ReadyForEngraving => "READY_FOR_ENGRAVING",
            ChunkStatus::Engraving => "ENGRAVING",
            ChunkStatus::ReadyForShipping => "READY_FOR_SHIPPING",
            ChunkStatus::Cancelled => "CANCELLED",
        }
    }

    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChunkStatus::Picked | ChunkStatus::ReadyForShipping | ChunkStatus::Cancelled
        )
    }
}

// ==========================================
// 拣选车状态 (Cart Status)
// ==========================================
// 红线: 同一时刻一辆车至多被一个非终态 chunk 占用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    Available,   // 空闲
    Picking,     // 拣选占用
    Engraving,   // 刻字占用
    PickedReady, // 拣毕待交接
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl CartStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PICKING" => CartStatus::Picking,
            "ENGRAVING" => CartStatus::Engraving,
            "PICKED_READY" => CartStatus::PickedReady,
            _ => CartStatus::Available,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CartStatus::Available => "AVAILABLE",
            CartStatus::Picking => "PICKING",
            CartStatus::Engraving => "ENGRAVING",
            CartStatus::PickedReady => "PICKED_READY",
        }
    }
}
