// ==========================================
// 仓储拣选编排系统 - 批次数据仓储
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Batch
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::types::{BatchStatus, BatchType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 批次 SELECT 列(与 map_row 对齐)
pub(crate) const BATCH_COLUMNS: &str =
    "batch_id, batch_name, batch_type, priority, status, personalized, oversized, \
     created_at, updated_at";

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    /// 创建新的 BatchRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建批次
    pub fn insert(&self, batch: &Batch) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO batch (
                batch_id, batch_name, batch_type, priority, status,
                personalized, oversized, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &batch.batch_id,
                &batch.batch_name,
                batch.batch_type.to_db_str(),
                &batch.priority,
                batch.status.to_db_str(),
                batch.personalized as i32,
                batch.oversized as i32,
                format_ts(&batch.created_at),
                format_ts(&batch.updated_at),
            ],
        )?;

        Ok(batch.batch_id.clone())
    }

    /// 按 batch_id 查询批次
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("SELECT {} FROM batch WHERE batch_id = ?", BATCH_COLUMNS),
            params![batch_id],
            Self::map_row,
        ) {
            Ok(batch) => Ok(Some(batch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有批次(优先级降序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM batch ORDER BY priority DESC, created_at",
            BATCH_COLUMNS
        ))?;

        let batches = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<Batch>, _>>()?;

        Ok(batches)
    }

    /// 更新批次状态
    pub fn update_status(&self, batch_id: &str, status: BatchStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE batch
               SET status = ?, updated_at = datetime('now', 'localtime')
               WHERE batch_id = ?"#,
            params![status.to_db_str(), batch_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Batch".to_string(),
                id: batch_id.to_string(),
            });
        }

        Ok(())
    }

    /// 映射数据库行到 Batch 对象
    pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Batch> {
        Ok(Batch {
            batch_id: row.get(0)?,
            batch_name: row.get(1)?,
            batch_type: BatchType::from_str(&row.get::<_, String>(2)?),
            priority: row.get(3)?,
            status: BatchStatus::from_str(&row.get::<_, String>(4)?),
            personalized: row.get::<_, i32>(5)? == 1,
            oversized: row.get::<_, i32>(6)? == 1,
            created_at: parse_ts(7, row.get::<_, String>(7)?)?,
            updated_at: parse_ts(8, row.get::<_, String>(8)?)?,
        })
    }
}
