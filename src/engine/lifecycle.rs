// ==========================================
// 仓储拣选编排系统 - 生命周期管理引擎
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 4.6 Lifecycle Manager
// ==========================================
// 状态机: PICKING -> PICKED | READY_FOR_ENGRAVING
//         READY_FOR_ENGRAVING -> ENGRAVING -> READY_FOR_SHIPPING
//         CANCELLED 仅可从 PICKING / PICKED 到达
// 红线: 1. 每个操作整体一个事务, 补偿不得留下半完成状态
//       2. 面单预购事件只在事务提交之后发出, 其失败不回滚业务
//       3. 刻字进度每次写入都经 validate 校验
//       4. 刻字取消仅在零件已刻时允许
// ==========================================

use crate::domain::chunk::{Chunk, EngravingProgress};
use crate::domain::types::{
    BulkBatchStatus, CartStatus, ChunkStatus, OrderStatus,
};
use crate::engine::events::{OptionalEventPublisher, PickingEvent, PickingEventType};
use crate::repository::chunk_repo::{ChunkRepository, CHUNK_COLUMNS};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::format_ts;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// LifecycleManager - 生命周期管理引擎
// ==========================================
pub struct LifecycleManager {
    conn: Arc<Mutex<Connection>>,
    event_publisher: OptionalEventPublisher,
}

impl LifecycleManager {
    pub fn new(conn: Arc<Mutex<Connection>>, event_publisher: OptionalEventPublisher) -> Self {
        Self {
            conn,
            event_publisher,
        }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn load_chunk(tx: &Transaction, chunk_id: &str) -> RepositoryResult<Chunk> {
        match tx.query_row(
            &format!("SELECT {} FROM chunk WHERE chunk_id = ?", CHUNK_COLUMNS),
            params![chunk_id],
            ChunkRepository::map_row,
        ) {
            Ok(chunk) => Ok(chunk),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
                entity: "Chunk".to_string(),
                id: chunk_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn require_status(chunk: &Chunk, expected: ChunkStatus) -> RepositoryResult<()> {
        if chunk.status != expected {
            return Err(RepositoryError::InvalidStateTransition {
                from: chunk.status.to_db_str().to_string(),
                to: expected.to_db_str().to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 拣选阶段
    // ==========================================

    /// 完成单个格位 (确认动作, 不改 chunk 状态)
    ///
    /// 校验 chunk 处于 PICKING 且该格位确实属于本 chunk
    pub fn complete_bin(&self, chunk_id: &str, bin_number: i32) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let chunk = Self::load_chunk(&tx, chunk_id)?;
        Self::require_status(&chunk, ChunkStatus::Picking)?;

        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM orders WHERE chunk_id = ? AND bin_number = ?",
            params![chunk_id, bin_number],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(RepositoryError::ValidationError(format!(
                "格位 {} 不属于 chunk {}",
                bin_number, chunk_id
            )));
        }

        tx.commit()?;
        tracing::debug!("格位确认 - chunk_id={}, bin_number={}", chunk_id, bin_number);
        Ok(())
    }

    /// 完成整个 chunk
    ///
    /// 个性化 chunk 进入 READY_FOR_ENGRAVING (车继续被占用);
    /// 标准 chunk 进入 PICKED, 车翻转 PICKED_READY,
    /// 提交后发出 ChunkPicked 事件触发面单预购
    pub fn complete_chunk(&self, chunk_id: &str) -> RepositoryResult<Chunk> {
        let (chunk, personalized) = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction()?;

            let chunk = Self::load_chunk(&tx, chunk_id)?;
            Self::require_status(&chunk, ChunkStatus::Picking)?;

            let personalized: bool = tx.query_row(
                "SELECT personalized FROM batch WHERE batch_id = ?",
                params![&chunk.batch_id],
                |row| row.get(0),
            )?;

            let now = chrono::Local::now().naive_local();
            let next_status = if personalized {
                ChunkStatus::ReadyForEngraving
            } else {
                ChunkStatus::Picked
            };

            tx.execute(
                "UPDATE chunk SET status = ?, pick_completed_at = ? WHERE chunk_id = ?",
                params![next_status.to_db_str(), format_ts(&now), chunk_id],
            )?;

            tx.execute(
                "UPDATE orders SET status = ?, updated_at = datetime('now', 'localtime') WHERE chunk_id = ?",
                params![OrderStatus::Picked.to_db_str(), chunk_id],
            )?;

            if !personalized {
                tx.execute(
                    "UPDATE cart SET status = ? WHERE cart_id = ?",
                    params![CartStatus::PickedReady.to_db_str(), &chunk.cart_id],
                )?;
            }

            tx.commit()?;

            let mut updated = chunk;
            updated.status = next_status;
            updated.pick_completed_at = Some(now);
            (updated, personalized)
        };

        tracing::info!(
            "chunk 拣毕 - chunk_id={}, status={}, personalized={}",
            chunk_id,
            chunk.status,
            personalized
        );

        if !personalized {
            self.event_publisher.publish_after_commit(PickingEvent::new(
                chunk_id.to_string(),
                PickingEventType::ChunkPicked,
                Some("lifecycle".to_string()),
            ));
        }

        Ok(chunk)
    }

    /// 缺货补偿: 释放指定格位的订单回池
    ///
    /// 被释放订单 chunk_id/bin_number 置空并回到待发货;
    /// chunk 的 orders_in_chunk 减少、orders_skipped 增加相同数量
    pub fn out_of_stock(&self, chunk_id: &str, bin_numbers: &[i32]) -> RepositoryResult<Chunk> {
        if bin_numbers.is_empty() {
            return Err(RepositoryError::ValidationError(
                "bin_numbers 不能为空".to_string(),
            ));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let chunk = Self::load_chunk(&tx, chunk_id)?;
        Self::require_status(&chunk, ChunkStatus::Picking)?;

        let placeholders = crate::repository::sql_placeholders(bin_numbers.len());
        let mut sql_params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(bin_numbers.len() + 2);
        let awaiting = OrderStatus::AwaitingShipment.to_db_str();
        sql_params.push(&awaiting);
        let chunk_id_param = chunk_id.to_string();
        sql_params.push(&chunk_id_param);
        for bin in bin_numbers {
            sql_params.push(bin);
        }
        let released = tx.execute(
            &format!(
                r#"UPDATE orders
                   SET chunk_id = NULL, bin_number = NULL, status = ?,
                       updated_at = datetime('now', 'localtime')
                   WHERE chunk_id = ? AND bin_number IN ({})"#,
                placeholders
            ),
            sql_params.as_slice(),
        )?;
        if released == 0 {
            return Err(RepositoryError::ValidationError(format!(
                "指定格位没有可释放的订单: chunk_id={}, bins={:?}",
                chunk_id, bin_numbers
            )));
        }

        tx.execute(
            r#"UPDATE chunk
               SET orders_in_chunk = orders_in_chunk - ?,
                   orders_skipped = orders_skipped + ?
               WHERE chunk_id = ?"#,
            params![released as i32, released as i32, chunk_id],
        )?;

        tx.commit()?;

        tracing::info!(
            "缺货释放 - chunk_id={}, bins={:?}, released={}",
            chunk_id,
            bin_numbers,
            released
        );

        let mut updated = chunk;
        updated.orders_in_chunk -= released as i32;
        updated.orders_skipped += released as i32;
        Ok(updated)
    }

    /// 取消 chunk (仅 PICKING / PICKED 可达)
    ///
    /// 解除全部订单占用、释放拣选车、回退批量子批, 并记录原因。
    /// 重复取消返回状态转换错误, 不会二次释放拣选车
    pub fn cancel_chunk(&self, chunk_id: &str, reason: Option<&str>) -> RepositoryResult<Chunk> {
        let chunk = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction()?;

            let chunk = Self::load_chunk(&tx, chunk_id)?;
            if !chunk.is_cancellable() {
                return Err(RepositoryError::InvalidStateTransition {
                    from: chunk.status.to_db_str().to_string(),
                    to: ChunkStatus::Cancelled.to_db_str().to_string(),
                });
            }

            // 已解除占用的订单不会被重复更新, 部分失败后重试安全
            tx.execute(
                r#"UPDATE orders
                   SET chunk_id = NULL, bin_number = NULL, status = ?,
                       updated_at = datetime('now', 'localtime')
                   WHERE chunk_id = ?"#,
                params![OrderStatus::AwaitingShipment.to_db_str(), chunk_id],
            )?;

            // BULK 货架回退 PENDING, 解除绑定
            tx.execute(
                r#"UPDATE bulk_batch SET status = ?
                   WHERE bulk_batch_id IN (
                       SELECT bulk_batch_id FROM chunk_bulk_batch WHERE chunk_id = ?
                   )"#,
                params![BulkBatchStatus::Pending.to_db_str(), chunk_id],
            )?;
            tx.execute(
                "DELETE FROM chunk_bulk_batch WHERE chunk_id = ?",
                params![chunk_id],
            )?;

            tx.execute(
                "UPDATE chunk SET status = ?, cancel_reason = ? WHERE chunk_id = ?",
                params![
                    ChunkStatus::Cancelled.to_db_str(),
                    reason,
                    chunk_id
                ],
            )?;

            tx.execute(
                "UPDATE cart SET status = ? WHERE cart_id = ?",
                params![CartStatus::Available.to_db_str(), &chunk.cart_id],
            )?;

            tx.commit()?;

            let mut updated = chunk;
            updated.status = ChunkStatus::Cancelled;
            updated.cancel_reason = reason.map(|r| r.to_string());
            updated
        };

        tracing::info!(
            "chunk 取消 - chunk_id={}, reason={:?}",
            chunk_id,
            chunk.cancel_reason
        );

        self.event_publisher.publish_after_commit(PickingEvent::new(
            chunk_id.to_string(),
            PickingEventType::ChunkCancelled,
            Some("lifecycle".to_string()),
        ));

        Ok(chunk)
    }

    // ==========================================
    // 刻字子流程 (仅个性化 chunk)
    // ==========================================

    /// 开始刻字: READY_FOR_ENGRAVING -> ENGRAVING, 车翻转 ENGRAVING
    pub fn start_engraving(&self, chunk_id: &str, engraver_name: &str) -> RepositoryResult<Chunk> {
        if engraver_name.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "engraver_name 不能为空".to_string(),
            ));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let chunk = Self::load_chunk(&tx, chunk_id)?;
        Self::require_status(&chunk, ChunkStatus::ReadyForEngraving)?;

        let now = chrono::Local::now().naive_local();
        let progress = EngravingProgress::default();
        let progress_json = progress.to_json()?;

        tx.execute(
            r#"UPDATE chunk
               SET status = ?, engraver_name = ?, engraving_started_at = ?,
                   engraving_progress_json = ?, items_engraved = 0
               WHERE chunk_id = ?"#,
            params![
                ChunkStatus::Engraving.to_db_str(),
                engraver_name,
                format_ts(&now),
                &progress_json,
                chunk_id
            ],
        )?;
        tx.execute(
            "UPDATE cart SET status = ? WHERE cart_id = ?",
            params![CartStatus::Engraving.to_db_str(), &chunk.cart_id],
        )?;

        tx.commit()?;

        tracing::info!(
            "刻字开始 - chunk_id={}, engraver={}",
            chunk_id,
            engraver_name
        );

        let mut updated = chunk;
        updated.status = ChunkStatus::Engraving;
        updated.engraver_name = Some(engraver_name.to_string());
        updated.engraving_started_at = Some(now);
        updated.engraving_progress = Some(progress);
        updated.items_engraved = 0;
        Ok(updated)
    }

    /// 写入刻字进度检查点 (可重复提交, 幂等)
    ///
    /// 进度以 chunk 在册订单数为上限做一致性校验
    pub fn mark_engraved_item(
        &self,
        chunk_id: &str,
        progress: EngravingProgress,
    ) -> RepositoryResult<Chunk> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let chunk = Self::load_chunk(&tx, chunk_id)?;
        Self::require_status(&chunk, ChunkStatus::Engraving)?;

        progress
            .validate(chunk.orders_in_chunk as usize)
            .map_err(RepositoryError::ValidationError)?;

        // 已刻的件是物理事实, 检查点只能前进不能回退
        if let Some(stored) = &chunk.engraving_progress {
            if !stored.completed_indices.is_subset(&progress.completed_indices) {
                return Err(RepositoryError::ValidationError(
                    "进度检查点不得撤销已完成的件".to_string(),
                ));
            }
        }

        let items_engraved = progress.completed_indices.len() as i32;
        let progress_json = progress.to_json()?;
        tx.execute(
            "UPDATE chunk SET engraving_progress_json = ?, items_engraved = ? WHERE chunk_id = ?",
            params![&progress_json, items_engraved, chunk_id],
        )?;

        tx.commit()?;

        tracing::debug!(
            "刻字进度 - chunk_id={}, items_engraved={}, current_index={}",
            chunk_id,
            items_engraved,
            progress.current_index
        );

        let mut updated = chunk;
        updated.engraving_progress = Some(progress);
        updated.items_engraved = items_engraved;
        Ok(updated)
    }

    /// 整体标记已刻: 全部件计为完成, 不做状态转换
    pub fn mark_engraved(&self, chunk_id: &str) -> RepositoryResult<Chunk> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let chunk = Self::load_chunk(&tx, chunk_id)?;
        Self::require_status(&chunk, ChunkStatus::Engraving)?;

        let total = chunk.orders_in_chunk as usize;
        let progress = EngravingProgress {
            completed_indices: (0..total).collect(),
            current_index: total,
            total_paused_ms: chunk
                .engraving_progress
                .as_ref()
                .map(|p| p.total_paused_ms)
                .unwrap_or(0),
        };
        let progress_json = progress.to_json()?;

        tx.execute(
            "UPDATE chunk SET engraving_progress_json = ?, items_engraved = ? WHERE chunk_id = ?",
            params![&progress_json, total as i32, chunk_id],
        )?;

        tx.commit()?;

        tracing::info!("整体标记已刻 - chunk_id={}, items={}", chunk_id, total);

        let mut updated = chunk;
        updated.items_engraved = total as i32;
        updated.engraving_progress = Some(progress);
        Ok(updated)
    }

    /// 完成刻字: ENGRAVING -> READY_FOR_SHIPPING, 车翻转 PICKED_READY
    pub fn complete_engraving(&self, chunk_id: &str) -> RepositoryResult<Chunk> {
        let chunk = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction()?;

            let chunk = Self::load_chunk(&tx, chunk_id)?;
            Self::require_status(&chunk, ChunkStatus::Engraving)?;

            let now = chrono::Local::now().naive_local();
            tx.execute(
                "UPDATE chunk SET status = ?, engraving_completed_at = ? WHERE chunk_id = ?",
                params![
                    ChunkStatus::ReadyForShipping.to_db_str(),
                    format_ts(&now),
                    chunk_id
                ],
            )?;
            tx.execute(
                "UPDATE cart SET status = ? WHERE cart_id = ?",
                params![CartStatus::PickedReady.to_db_str(), &chunk.cart_id],
            )?;

            tx.commit()?;

            let mut updated = chunk;
            updated.status = ChunkStatus::ReadyForShipping;
            updated.engraving_completed_at = Some(now);
            updated
        };

        tracing::info!("刻字完成 - chunk_id={}", chunk_id);

        self.event_publisher.publish_after_commit(PickingEvent::new(
            chunk_id.to_string(),
            PickingEventType::EngravingCompleted,
            Some("lifecycle".to_string()),
        ));

        Ok(chunk)
    }

    /// 取消刻字: 仅零件已刻时允许, 回到 READY_FOR_ENGRAVING
    pub fn cancel_engraving(&self, chunk_id: &str) -> RepositoryResult<Chunk> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let chunk = Self::load_chunk(&tx, chunk_id)?;
        Self::require_status(&chunk, ChunkStatus::Engraving)?;

        if chunk.items_engraved > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "已刻 {} 件, 不允许取消刻字",
                chunk.items_engraved
            )));
        }

        tx.execute(
            r#"UPDATE chunk
               SET status = ?, engraver_name = NULL, engraving_started_at = NULL,
                   engraving_progress_json = NULL
               WHERE chunk_id = ?"#,
            params![ChunkStatus::ReadyForEngraving.to_db_str(), chunk_id],
        )?;
        tx.execute(
            "UPDATE cart SET status = ? WHERE cart_id = ?",
            params![CartStatus::Picking.to_db_str(), &chunk.cart_id],
        )?;

        tx.commit()?;

        tracing::info!("刻字取消 - chunk_id={}", chunk_id);

        let mut updated = chunk;
        updated.status = ChunkStatus::ReadyForEngraving;
        updated.engraver_name = None;
        updated.engraving_started_at = None;
        updated.engraving_progress = None;
        Ok(updated)
    }
}
