// ==========================================
// 仓储拣选编排系统 - 核心库
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md
// 技术栈: Rust + SQLite + axum
// 系统定位: 仓储履约控制平面 (拣选编排与批量合单)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 外部协作者服务层 - 库位解析/面单预购
pub mod services;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// Schema 初始化
pub mod schema;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BatchStatus, BatchType, BulkBatchStatus, CartStatus, ChunkStatus, ItemType, OrderCategory,
    OrderStatus, PickingMode,
};

// 领域实体
pub use domain::{
    Batch, BatchCellAssignment, BulkBatch, Cart, Cell, Chunk, ChunkBulkBatchAssignment,
    EngravingProgress, Order, OrderItem, SkuLayoutEntry,
};

// 引擎
pub use engine::{
    BinAssigner, BulkSplitter, ChunkAllocator, ClaimLimits, ClaimTarget, LifecycleManager,
    OrderClassifier,
};

// API
pub use api::{OrderApi, PickingApi, SettingsApi};

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用名称
pub const APP_NAME: &str = "仓储拣选编排系统";
