// ==========================================
// 仓储拣选编排系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{OrderApi, PickingApi, SettingsApi};
use crate::config::SettingsManager;
use crate::db::{configure_sqlite_connection, warn_on_schema_mismatch};
use crate::engine::bin_assigner::BinAssigner;
use crate::engine::events::{OptionalEventPublisher, PickingEventPublisher};
use crate::engine::{ChunkAllocator, LifecycleManager};
use crate::repository::{
    batch_repo::BatchRepository, bulk_batch_repo::BulkBatchRepository, cart_repo::CartRepository,
    cell_repo::CellRepository, chunk_repo::ChunkRepository, order_repo::OrderRepository,
};
use crate::schema;
use crate::services::SqliteLocationResolver;

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 拣选操作API
    pub picking_api: Arc<PickingApi>,

    /// 订单接入/分类API
    pub order_api: Arc<OrderApi>,

    /// 配置API
    pub settings_api: Arc<SettingsApi>,

    /// 配置管理器
    pub settings: Arc<SettingsManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 该方法会:
    /// 1. 打开共享数据库连接并初始化 schema
    /// 2. 初始化所有Repository
    /// 3. 初始化所有Engine
    /// 4. 创建所有API实例
    pub fn new(
        db_path: String,
        event_publisher: Option<Arc<dyn PickingEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = Connection::open(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        configure_sqlite_connection(&conn).map_err(|e| format!("无法配置数据库连接: {}", e))?;
        schema::init_schema(&conn).map_err(|e| format!("无法初始化schema: {}", e))?;
        schema::seed_default_config(&conn).map_err(|e| format!("无法写入默认配置: {}", e))?;
        warn_on_schema_mismatch(&conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let bulk_batch_repo = Arc::new(BulkBatchRepository::new(conn.clone()));
        let cart_repo = Arc::new(CartRepository::new(conn.clone()));
        let cell_repo = Arc::new(CellRepository::new(conn.clone()));
        let chunk_repo = Arc::new(ChunkRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================

        // 配置管理器（独立连接）
        let settings = Arc::new(
            SettingsManager::new(&db_path).map_err(|e| format!("无法创建SettingsManager: {}", e))?,
        );

        // 库位解析器（独立连接, 避免与领取事务互相持锁）
        let location_resolver = Arc::new(
            SqliteLocationResolver::new(&db_path)
                .map_err(|e| format!("无法创建SqliteLocationResolver: {}", e))?,
        );

        let allocator_publisher = event_publisher
            .clone()
            .map(OptionalEventPublisher::with_publisher)
            .unwrap_or_default();
        let lifecycle_publisher = event_publisher
            .map(OptionalEventPublisher::with_publisher)
            .unwrap_or_default();

        // 事务引擎共享同一条业务连接, 以数据库事务为唯一同步原语
        let allocator = Arc::new(ChunkAllocator::new(
            conn.clone(),
            BinAssigner::new(location_resolver),
            allocator_publisher,
        ));
        let lifecycle = Arc::new(LifecycleManager::new(conn.clone(), lifecycle_publisher));

        // ==========================================
        // 初始化API层
        // ==========================================
        let picking_api = Arc::new(PickingApi::new(
            allocator,
            lifecycle,
            settings.clone(),
            cart_repo,
            cell_repo,
            chunk_repo,
            order_repo.clone(),
            bulk_batch_repo.clone(),
        ));
        let order_api = Arc::new(OrderApi::new(
            order_repo,
            batch_repo,
            bulk_batch_repo,
            settings.clone(),
        ));
        let settings_api = Arc::new(SettingsApi::new(settings.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            picking_api,
            order_api,
            settings_api,
            settings,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: WMS_PICKING_DB_PATH 环境变量 > 用户数据目录 > 当前目录回退
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("WMS_PICKING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./wms_picking.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("wms-picking-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("wms-picking");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("wms_picking.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(path.ends_with("wms_picking.db"));
    }
}
