// ==========================================
// 仓储拣选编排系统 - Chunk 数据仓储
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Chunk
// 红线: Repository 不含业务逻辑
// 红线: chunk 的创建与状态迁移在引擎层事务内完成,
//       此处只提供查询与行映射
// ==========================================

use crate::domain::chunk::{Chunk, ChunkBulkBatchAssignment, EngravingProgress};
use crate::domain::types::{ChunkStatus, PickingMode};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::parse_ts;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// chunk SELECT 列(与 map_row 对齐)
pub(crate) const CHUNK_COLUMNS: &str =
    "chunk_id, batch_id, chunk_number, picking_mode, status, cart_id, picker_name, \
     orders_in_chunk, orders_skipped, claimed_at, pick_started_at, pick_completed_at, \
     cancel_reason, engraver_name, engraving_started_at, engraving_completed_at, \
     engraving_progress_json, items_engraved";

// ==========================================
// ChunkRepository - Chunk 仓储
// ==========================================
pub struct ChunkRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChunkRepository {
    /// 创建新的 ChunkRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 chunk_id 查询
    pub fn find_by_id(&self, chunk_id: &str) -> RepositoryResult<Option<Chunk>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("SELECT {} FROM chunk WHERE chunk_id = ?", CHUNK_COLUMNS),
            params![chunk_id],
            Self::map_row,
        ) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询拣选区内的非终态 chunk
    ///
    /// 口径: chunk -> batch -> batch_cell_assignment 路由到该 cell
    pub fn list_active_by_cell(&self, cell_id: &str) -> RepositoryResult<Vec<Chunk>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {}
               FROM chunk c
               INNER JOIN batch_cell_assignment bca ON c.batch_id = bca.batch_id
               WHERE bca.cell_id = ?
                 AND c.status NOT IN ('PICKED', 'READY_FOR_SHIPPING', 'CANCELLED')
               ORDER BY c.claimed_at"#,
            Self::prefixed_columns("c")
        ))?;

        let chunks = stmt
            .query_map(params![cell_id], Self::map_row)?
            .collect::<Result<Vec<Chunk>, _>>()?;

        Ok(chunks)
    }

    /// 查询 chunk 的货架绑定(层号升序)
    pub fn find_shelves(&self, chunk_id: &str) -> RepositoryResult<Vec<ChunkBulkBatchAssignment>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT chunk_id, bulk_batch_id, shelf_number
               FROM chunk_bulk_batch
               WHERE chunk_id = ?
               ORDER BY shelf_number"#,
        )?;

        let shelves = stmt
            .query_map(params![chunk_id], |row| {
                Ok(ChunkBulkBatchAssignment {
                    chunk_id: row.get(0)?,
                    bulk_batch_id: row.get(1)?,
                    shelf_number: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<ChunkBulkBatchAssignment>, _>>()?;

        Ok(shelves)
    }

    /// 带表别名的列清单(JOIN 查询用)
    fn prefixed_columns(alias: &str) -> String {
        CHUNK_COLUMNS
            .split(", ")
            .map(|c| format!("{}.{}", alias, c.trim()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 映射数据库行到 Chunk 对象
    pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
        let progress = match row.get::<_, Option<String>>(16)? {
            Some(json) => Some(EngravingProgress::from_json(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    16,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?),
            None => None,
        };

        Ok(Chunk {
            chunk_id: row.get(0)?,
            batch_id: row.get(1)?,
            chunk_number: row.get(2)?,
            picking_mode: PickingMode::from_str(&row.get::<_, String>(3)?),
            status: ChunkStatus::from_str(&row.get::<_, String>(4)?),
            cart_id: row.get(5)?,
            picker_name: row.get(6)?,
            orders_in_chunk: row.get(7)?,
            orders_skipped: row.get(8)?,
            claimed_at: parse_ts(9, row.get::<_, String>(9)?)?,
            pick_started_at: Self::opt_ts(row, 10)?,
            pick_completed_at: Self::opt_ts(row, 11)?,
            cancel_reason: row.get(12)?,
            engraver_name: row.get(13)?,
            engraving_started_at: Self::opt_ts(row, 14)?,
            engraving_completed_at: Self::opt_ts(row, 15)?,
            engraving_progress: progress,
            items_engraved: row.get(17)?,
        })
    }

    /// 解析可空时间戳列
    fn opt_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
        match row.get::<_, Option<String>>(idx)? {
            Some(s) => Ok(Some(parse_ts(idx, s)?)),
            None => Ok(None),
        }
    }
}
