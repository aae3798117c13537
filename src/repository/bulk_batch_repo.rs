// ==========================================
// 仓储拣选编排系统 - 批量子批数据仓储
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / BulkBatch
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::batch::BulkBatch;
use crate::domain::types::BulkBatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts, sql_placeholders};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 批量子批 SELECT 列(与 map_row 对齐)
pub(crate) const BULK_BATCH_COLUMNS: &str =
    "bulk_batch_id, batch_id, signature, split_index, order_count, \
     sku_layout_json, status, created_at";

// ==========================================
// BulkBatchRepository - 批量子批仓储
// ==========================================
pub struct BulkBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BulkBatchRepository {
    /// 创建新的 BulkBatchRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建子批
    pub fn insert(&self, bulk_batch: &BulkBatch) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO bulk_batch (
                bulk_batch_id, batch_id, signature, split_index, order_count,
                sku_layout_json, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &bulk_batch.bulk_batch_id,
                &bulk_batch.batch_id,
                &bulk_batch.signature,
                &bulk_batch.split_index,
                &bulk_batch.order_count,
                bulk_batch.sku_layout_json()?,
                bulk_batch.status.to_db_str(),
                format_ts(&bulk_batch.created_at),
            ],
        )?;

        Ok(bulk_batch.bulk_batch_id.clone())
    }

    /// 批量查询子批
    pub fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<BulkBatch>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;

        let sql = format!(
            "SELECT {} FROM bulk_batch WHERE bulk_batch_id IN ({}) ORDER BY split_index",
            BULK_BATCH_COLUMNS,
            sql_placeholders(ids.len())
        );

        let mut stmt = conn.prepare(&sql)?;
        let bbs = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), Self::map_row)?
            .collect::<Result<Vec<BulkBatch>, _>>()?;

        Ok(bbs)
    }

    /// 删除批次下所有待领取子批(重建分组时使用)
    ///
    /// # 红线
    /// - 只清理 PENDING 子批;已绑定货架的子批不可动
    pub fn delete_pending_by_batch(&self, batch_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let count = conn.execute(
            "DELETE FROM bulk_batch WHERE batch_id = ? AND status = 'PENDING'",
            params![batch_id],
        )?;

        Ok(count)
    }

    /// 映射数据库行到 BulkBatch 对象
    pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<BulkBatch> {
        let layout_json: String = row.get(5)?;
        let sku_layout = BulkBatch::parse_sku_layout(&layout_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(BulkBatch {
            bulk_batch_id: row.get(0)?,
            batch_id: row.get(1)?,
            signature: row.get(2)?,
            split_index: row.get(3)?,
            order_count: row.get(4)?,
            sku_layout,
            status: BulkBatchStatus::from_str(&row.get::<_, String>(6)?),
            created_at: parse_ts(7, row.get::<_, String>(7)?)?,
        })
    }
}
