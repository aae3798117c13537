// ==========================================
// 仓储拣选编排系统 - 库位解析服务
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 6. 外部接口 (Location/SKU resolver)
// 职责: 实现 Engine 层定义的 BinLocationResolver
// 红线: 必须使用独立数据库连接, 不得与领取事务共享连接
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::bin_assigner::BinLocationResolver;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_placeholders;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// SQLite 后备表实现: 查 sku_location 表
///
/// 未命中的 SKU 静默缺席, 由格位引擎回退到排序哨兵
pub struct SqliteLocationResolver {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLocationResolver {
    /// 打开独立连接 (与主业务连接隔离, 避免事务内互相持锁)
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl BinLocationResolver for SqliteLocationResolver {
    fn resolve_many(&self, skus: &[String]) -> RepositoryResult<HashMap<String, String>> {
        if skus.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT sku, bin_location FROM sku_location WHERE sku IN ({})",
            sql_placeholders(skus.len())
        ))?;
        let sql_params: Vec<&dyn rusqlite::ToSql> =
            skus.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

        let mut resolved = HashMap::new();
        let rows = stmt.query_map(sql_params.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (sku, location) = row?;
            resolved.insert(sku, location);
        }

        if resolved.len() < skus.len() {
            tracing::debug!(
                "库位解析部分未命中 - requested={}, resolved={}",
                skus.len(),
                resolved.len()
            );
        }

        Ok(resolved)
    }
}
