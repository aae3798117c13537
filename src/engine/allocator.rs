// ==========================================
// 仓储拣选编排系统 - 领取分配引擎 (事务核心)
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 4.4 Chunk Allocator
// 依据: Picking_Engine_Specs_v0.2.md - 5. 并发与资源模型
// ==========================================
// 红线: 1. 整个领取流程在单个 SQLite 事务内完成,
//          数据库是唯一同步原语, 不引入进程内锁
//       2. 订单选择只认 chunk_id IS NULL, 赋值与选择同事务 (CAS 语义)
//       3. 拣选车 AVAILABLE 前置条件在同一事务内检查并翻转,
//          并发领取同一辆车必须恰好一个成功
//       4. chunk_number 在事务内读 MAX 再插入, 批次内单调递增
// ==========================================

use crate::domain::cart::Cart;
use crate::domain::chunk::Chunk;
use crate::domain::order::{Order, OrderItem};
use crate::domain::types::{
    BatchStatus, BatchType, CartStatus, ChunkStatus, OrderStatus, PickingMode,
};
use crate::domain::batch::{Batch, BulkBatch};
use crate::engine::bin_assigner::{BinAssigner, SkuGroup};
use crate::engine::events::{OptionalEventPublisher, PickingEvent, PickingEventType};
use crate::engine::signature::compute_signature;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    batch_repo::BatchRepository, bulk_batch_repo::BulkBatchRepository, cart_repo::CartRepository,
    format_ts, order_repo::OrderRepository, sql_placeholders,
};
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// 领取请求参数
// ==========================================

/// 领取目标: 绑定拣选区, 或个性化池 (不绑区)
#[derive(Debug, Clone)]
pub enum ClaimTarget {
    Cell(String),
    Personalized,
}

/// 领取容量参数 (由调用方从配置读取后注入)
#[derive(Debug, Clone, Copy)]
pub struct ClaimLimits {
    pub max_bins_standard: usize,
    pub max_bins_oversized: usize,
    pub orders_per_bin: usize,
    pub shelves_per_chunk: usize,
}

/// 模式分支的订单选择结果
enum Selection {
    /// SINGLES: SKU 组, 组内订单共享格位
    SkuGroups(Vec<SkuGroup>),
    /// BULK: 货架 (子批 + 订单ID), 已按 split_index 升序
    Shelves(Vec<(BulkBatch, Vec<String>)>),
    /// 默认: (订单ID, 首个实物SKU), 一单一格
    ByLocation(Vec<(String, String)>),
}

impl Selection {
    fn order_ids(&self) -> Vec<String> {
        match self {
            Selection::SkuGroups(groups) => {
                groups.iter().flat_map(|g| g.order_ids.clone()).collect()
            }
            Selection::Shelves(shelves) => {
                shelves.iter().flat_map(|(_, ids)| ids.clone()).collect()
            }
            Selection::ByLocation(entries) => entries.iter().map(|(id, _)| id.clone()).collect(),
        }
    }
}

// ==========================================
// ChunkAllocator - 领取分配引擎
// ==========================================
pub struct ChunkAllocator {
    conn: Arc<Mutex<Connection>>,
    bin_assigner: BinAssigner,
    event_publisher: OptionalEventPublisher,
}

impl ChunkAllocator {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        bin_assigner: BinAssigner,
        event_publisher: OptionalEventPublisher,
    ) -> Self {
        Self {
            conn,
            bin_assigner,
            event_publisher,
        }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 领取一个 chunk
    ///
    /// 前置条件: 拣选车存在、启用且 AVAILABLE; 非个性化领取必须给出 cell_id。
    /// 全流程单事务: 选批次 → 选订单 → 建 chunk → 批量赋 chunk_id →
    /// 格位分配 → 车翻转 PICKING → 批次首领提升 IN_PROGRESS。
    pub fn claim_chunk(
        &self,
        cart_id: &str,
        picker_name: &str,
        target: ClaimTarget,
        limits: ClaimLimits,
    ) -> RepositoryResult<Chunk> {
        if cart_id.trim().is_empty() {
            return Err(RepositoryError::ValidationError("cart_id 不能为空".to_string()));
        }
        if picker_name.trim().is_empty() {
            return Err(RepositoryError::ValidationError("picker_name 不能为空".to_string()));
        }
        if let ClaimTarget::Cell(cell_id) = &target {
            if cell_id.trim().is_empty() {
                return Err(RepositoryError::ValidationError("cell_id 不能为空".to_string()));
            }
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 1. 拣选车前置条件: 存在、启用、AVAILABLE
        let cart = Self::load_cart(&tx, cart_id)?;
        if !cart.is_active {
            return Err(RepositoryError::StateConflict {
                message: format!("拣选车已停用: {}", cart_id),
            });
        }
        if cart.status != CartStatus::Available {
            return Err(RepositoryError::StateConflict {
                message: format!("拣选车不可用: {} (status={})", cart_id, cart.status),
            });
        }

        // 2. 批次选择
        let batch = match &target {
            ClaimTarget::Personalized => Self::select_personalized_batch(&tx)?,
            ClaimTarget::Cell(cell_id) => Self::select_batch_for_cell(&tx, cell_id)?,
        }
        .ok_or_else(|| RepositoryError::StateConflict {
            message: "没有可领取的订单".to_string(),
        })?;

        let max_bins = if batch.oversized {
            limits.max_bins_oversized
        } else {
            limits.max_bins_standard
        };
        // 配置上限不得超过车的物理格数
        let max_bins = max_bins.min(cart.bin_capacity.max(0) as usize);
        let picking_mode = match batch.batch_type {
            BatchType::Singles => PickingMode::Singles,
            BatchType::Bulk => PickingMode::Bulk,
            BatchType::Default => PickingMode::OrderBySize,
        };

        // 3. 模式分支的订单选择
        let selection = match picking_mode {
            PickingMode::Singles => {
                Self::select_singles(&tx, &batch.batch_id, max_bins, limits.orders_per_bin)?
            }
            PickingMode::Bulk => {
                Self::select_bulk(&tx, &batch.batch_id, limits.shelves_per_chunk)?
            }
            PickingMode::OrderBySize => Self::select_by_size(&tx, &batch.batch_id, max_bins)?,
        };

        let order_ids = selection.order_ids();
        if order_ids.is_empty() {
            return Err(RepositoryError::StateConflict {
                message: "没有可领取的订单".to_string(),
            });
        }

        // 4. 事务内取下一个 chunk_number
        let max_chunk_no: Option<i32> = tx.query_row(
            "SELECT MAX(chunk_number) FROM chunk WHERE batch_id = ?",
            params![&batch.batch_id],
            |row| row.get(0),
        )?;
        let chunk_number = max_chunk_no.unwrap_or(0) + 1;

        let now = chrono::Local::now().naive_local();
        let chunk_id = Uuid::new_v4().to_string();
        tx.execute(
            r#"INSERT INTO chunk (
                chunk_id, batch_id, chunk_number, picking_mode, status,
                cart_id, picker_name, orders_in_chunk, orders_skipped,
                claimed_at, pick_started_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)"#,
            params![
                &chunk_id,
                &batch.batch_id,
                chunk_number,
                picking_mode.to_db_str(),
                ChunkStatus::Picking.to_db_str(),
                cart_id,
                picker_name,
                order_ids.len() as i32,
                format_ts(&now),
                format_ts(&now),
            ],
        )?;

        // 5. 单条批量 UPDATE 赋 chunk_id (CAS: 只更新仍未被占用的订单)
        let mut sql_params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(order_ids.len() + 3);
        let chunk_id_param = chunk_id.clone();
        let assigned = OrderStatus::Assigned.to_db_str();
        let awaiting = OrderStatus::AwaitingShipment.to_db_str();
        sql_params.push(&chunk_id_param);
        sql_params.push(&assigned);
        for id in &order_ids {
            sql_params.push(id);
        }
        sql_params.push(&awaiting);
        let updated = tx.execute(
            &format!(
                r#"UPDATE orders
                   SET chunk_id = ?, status = ?, updated_at = datetime('now', 'localtime')
                   WHERE order_id IN ({}) AND chunk_id IS NULL AND status = ?"#,
                sql_placeholders(order_ids.len())
            ),
            sql_params.as_slice(),
        )?;
        if updated != order_ids.len() {
            // 正常情况下事务串行化会避免走到这里, CAS 不满足时整体回滚
            return Err(RepositoryError::StateConflict {
                message: format!(
                    "订单选择竞争失败: 期望 {} 实际 {}",
                    order_ids.len(),
                    updated
                ),
            });
        }

        // 6. 格位分配 (同事务)
        match &selection {
            Selection::SkuGroups(groups) => {
                self.bin_assigner.assign_singles(&tx, groups)?;
            }
            Selection::Shelves(shelves) => {
                self.bin_assigner.assign_bulk(&tx, &chunk_id, shelves)?;
            }
            Selection::ByLocation(entries) => {
                self.bin_assigner.assign_by_location(&tx, entries)?;
            }
        }

        // 7. 车翻转 PICKING (条件更新, 并发下第二个领取者在此失败)
        let cart_updated = tx.execute(
            "UPDATE cart SET status = ? WHERE cart_id = ? AND status = ?",
            params![
                CartStatus::Picking.to_db_str(),
                cart_id,
                CartStatus::Available.to_db_str(),
            ],
        )?;
        if cart_updated == 0 {
            return Err(RepositoryError::StateConflict {
                message: format!("拣选车已被并发占用: {}", cart_id),
            });
        }

        // 8. 批次首领提升 IN_PROGRESS (幂等)
        tx.execute(
            "UPDATE batch SET status = ?, updated_at = datetime('now', 'localtime') WHERE batch_id = ? AND status = ?",
            params![
                BatchStatus::InProgress.to_db_str(),
                &batch.batch_id,
                BatchStatus::Active.to_db_str(),
            ],
        )?;

        tx.commit()?;
        drop(conn);

        tracing::info!(
            "领取成功 - chunk_id={}, batch_id={}, chunk_number={}, mode={}, orders={}, picker={}",
            chunk_id,
            batch.batch_id,
            chunk_number,
            picking_mode,
            order_ids.len(),
            picker_name
        );

        // 事件在提交之后发布, 失败不影响领取结果
        self.event_publisher.publish_after_commit(PickingEvent::new(
            chunk_id.clone(),
            PickingEventType::ChunkClaimed,
            Some("allocator".to_string()),
        ));

        Ok(Chunk {
            chunk_id,
            batch_id: batch.batch_id,
            chunk_number,
            picking_mode,
            status: ChunkStatus::Picking,
            cart_id: cart_id.to_string(),
            picker_name: picker_name.to_string(),
            orders_in_chunk: order_ids.len() as i32,
            orders_skipped: 0,
            claimed_at: now,
            pick_started_at: Some(now),
            pick_completed_at: None,
            cancel_reason: None,
            engraver_name: None,
            engraving_started_at: None,
            engraving_completed_at: None,
            engraving_progress: None,
            items_engraved: 0,
        })
    }

    // ==========================================
    // 事务内查询辅助 (全部接收 &Transaction)
    // ==========================================

    fn load_cart(tx: &Transaction, cart_id: &str) -> RepositoryResult<Cart> {
        match tx.query_row(
            &format!(
                "SELECT {} FROM cart WHERE cart_id = ?",
                crate::repository::cart_repo::CART_COLUMNS
            ),
            params![cart_id],
            CartRepository::map_row,
        ) {
            Ok(cart) => Ok(cart),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
                entity: "Cart".to_string(),
                id: cart_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 个性化领取: 最高优先级的个性化批次, 且存在可领取订单
    fn select_personalized_batch(tx: &Transaction) -> RepositoryResult<Option<Batch>> {
        let result = tx.query_row(
            &format!(
                r#"SELECT {} FROM batch b
                   WHERE b.personalized = 1
                     AND b.status IN (?, ?)
                     AND EXISTS (
                         SELECT 1 FROM orders o
                         WHERE o.batch_id = b.batch_id
                           AND o.chunk_id IS NULL
                           AND o.status = ?
                     )
                   ORDER BY b.priority DESC
                   LIMIT 1"#,
                crate::repository::batch_repo::BATCH_COLUMNS
            ),
            params![
                BatchStatus::Active.to_db_str(),
                BatchStatus::InProgress.to_db_str(),
                OrderStatus::AwaitingShipment.to_db_str(),
            ],
            BatchRepository::map_row,
        );
        match result {
            Ok(batch) => Ok(Some(batch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 拣选区领取: 按区内路由优先级取第一个有可领订单的批次
    fn select_batch_for_cell(tx: &Transaction, cell_id: &str) -> RepositoryResult<Option<Batch>> {
        let result = tx.query_row(
            &format!(
                r#"SELECT {} FROM batch b
                   JOIN batch_cell_assignment a ON a.batch_id = b.batch_id
                   WHERE a.cell_id = ?
                     AND b.status IN (?, ?)
                     AND EXISTS (
                         SELECT 1 FROM orders o
                         WHERE o.batch_id = b.batch_id
                           AND o.chunk_id IS NULL
                           AND o.status = ?
                     )
                   ORDER BY a.priority ASC
                   LIMIT 1"#,
                crate::repository::batch_repo::BATCH_COLUMNS
                    .split(", ")
                    .map(|c| format!("b.{}", c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            params![
                cell_id,
                BatchStatus::Active.to_db_str(),
                BatchStatus::InProgress.to_db_str(),
                OrderStatus::AwaitingShipment.to_db_str(),
            ],
            BatchRepository::map_row,
        );
        match result {
            Ok(batch) => Ok(Some(batch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 批次内可领取订单 (chunk_id IS NULL 且待发货), 按创建时间先到先得
    fn load_claimable_orders(tx: &Transaction, batch_id: &str) -> RepositoryResult<Vec<Order>> {
        let mut stmt = tx.prepare(&format!(
            r#"SELECT {} FROM orders
               WHERE batch_id = ? AND chunk_id IS NULL AND status = ?
               ORDER BY created_at ASC, order_id ASC"#,
            crate::repository::order_repo::ORDER_COLUMNS
        ))?;
        let orders = stmt
            .query_map(
                params![batch_id, OrderStatus::AwaitingShipment.to_db_str()],
                OrderRepository::map_row,
            )?
            .collect::<Result<Vec<Order>, _>>()?;
        Ok(orders)
    }

    fn load_items_for(
        tx: &Transaction,
        order_ids: &[String],
    ) -> RepositoryResult<HashMap<String, Vec<OrderItem>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut stmt = tx.prepare(&format!(
            r#"SELECT order_id, line_no, sku, item_name, quantity, item_type
               FROM order_item
               WHERE order_id IN ({})
               ORDER BY order_id, line_no"#,
            sql_placeholders(order_ids.len())
        ))?;
        let sql_params: Vec<&dyn rusqlite::ToSql> =
            order_ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        let mut grouped: HashMap<String, Vec<OrderItem>> = HashMap::new();
        let rows = stmt.query_map(sql_params.as_slice(), OrderRepository::map_item_row)?;
        for row in rows {
            let item = row?;
            grouped.entry(item.order_id.clone()).or_default().push(item);
        }
        Ok(grouped)
    }

    /// SINGLES: 按主导 SKU 分组, 最多 max_bins 组, 每组上限 orders_per_bin 单
    fn select_singles(
        tx: &Transaction,
        batch_id: &str,
        max_bins: usize,
        orders_per_bin: usize,
    ) -> RepositoryResult<Selection> {
        let orders = Self::load_claimable_orders(tx, batch_id)?;
        let ids: Vec<String> = orders.iter().map(|o| o.order_id.clone()).collect();
        let items = Self::load_items_for(tx, &ids)?;

        let mut group_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, SkuGroup> = HashMap::new();
        for order in &orders {
            let Some(order_items) = items.get(&order.order_id) else {
                continue;
            };
            let signature = compute_signature(order_items);
            let Some(sku) = signature.dominant_sku() else {
                continue;
            };
            let sku = sku.to_string();
            if let Some(group) = groups.get_mut(&sku) {
                if group.order_ids.len() < orders_per_bin {
                    group.order_ids.push(order.order_id.clone());
                }
            } else {
                if group_order.len() >= max_bins {
                    continue;
                }
                group_order.push(sku.clone());
                groups.insert(
                    sku.clone(),
                    SkuGroup {
                        sku,
                        order_ids: vec![order.order_id.clone()],
                    },
                );
            }
        }

        let selected = group_order
            .into_iter()
            .filter_map(|sku| groups.remove(&sku))
            .collect();
        Ok(Selection::SkuGroups(selected))
    }

    /// BULK: 最多 shelves_per_chunk 个 PENDING 子批 (split_index 升序) 及其全部可领订单
    fn select_bulk(
        tx: &Transaction,
        batch_id: &str,
        shelves_per_chunk: usize,
    ) -> RepositoryResult<Selection> {
        let mut stmt = tx.prepare(&format!(
            r#"SELECT {} FROM bulk_batch
               WHERE batch_id = ? AND status = ?
               ORDER BY split_index ASC
               LIMIT ?"#,
            crate::repository::bulk_batch_repo::BULK_BATCH_COLUMNS
        ))?;
        let bulk_batches = stmt
            .query_map(
                params![
                    batch_id,
                    crate::domain::types::BulkBatchStatus::Pending.to_db_str(),
                    shelves_per_chunk as i64,
                ],
                BulkBatchRepository::map_row,
            )?
            .collect::<Result<Vec<BulkBatch>, _>>()?;

        let mut shelves = Vec::with_capacity(bulk_batches.len());
        for bulk_batch in bulk_batches {
            let mut stmt = tx.prepare(
                r#"SELECT order_id FROM orders
                   WHERE bulk_batch_id = ? AND chunk_id IS NULL AND status = ?
                   ORDER BY created_at ASC, order_id ASC"#,
            )?;
            let order_ids = stmt
                .query_map(
                    params![
                        &bulk_batch.bulk_batch_id,
                        OrderStatus::AwaitingShipment.to_db_str()
                    ],
                    |row| row.get::<_, String>(0),
                )?
                .collect::<Result<Vec<String>, _>>()?;
            if !order_ids.is_empty() {
                shelves.push((bulk_batch, order_ids));
            }
        }
        Ok(Selection::Shelves(shelves))
    }

    /// 默认模式: 最多 max_bins 单, 一单一格, 记录首个实物 SKU 供库位排序
    fn select_by_size(
        tx: &Transaction,
        batch_id: &str,
        max_bins: usize,
    ) -> RepositoryResult<Selection> {
        let orders = Self::load_claimable_orders(tx, batch_id)?;
        let truncated: Vec<&Order> = orders.iter().take(max_bins).collect();
        let ids: Vec<String> = truncated.iter().map(|o| o.order_id.clone()).collect();
        let items = Self::load_items_for(tx, &ids)?;

        let entries = truncated
            .iter()
            .map(|order| {
                let first_sku = items
                    .get(&order.order_id)
                    .and_then(|list| list.iter().find(|i| i.is_physical()))
                    .map(|i| i.sku.trim().to_uppercase())
                    .unwrap_or_default();
                (order.order_id.clone(), first_sku)
            })
            .collect();
        Ok(Selection::ByLocation(entries))
    }
}
