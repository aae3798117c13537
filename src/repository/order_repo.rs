// ==========================================
// 仓储拣选编排系统 - 订单数据仓储
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Order
// 红线: Repository 不含业务逻辑
// 红线: chunk_id / bin_number 的回写只发生在引擎层事务内
// ==========================================

use crate::domain::order::{Order, OrderItem};
use crate::domain::types::{ItemType, OrderCategory, OrderStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts, sql_placeholders};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 订单 SELECT 列(与 map_row 对齐)
pub(crate) const ORDER_COLUMNS: &str = "order_id, order_number, status, personalized, category, \
     batch_id, bulk_batch_id, chunk_id, bin_number, created_at, updated_at";

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建订单及其订单行(同一事务)
    pub fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT INTO orders (
                order_id, order_number, status, personalized, category,
                batch_id, bulk_batch_id, chunk_id, bin_number,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &order.order_id,
                &order.order_number,
                order.status.to_db_str(),
                order.personalized as i32,
                order.category.map(|c| c.to_db_str()),
                &order.batch_id,
                &order.bulk_batch_id,
                &order.chunk_id,
                &order.bin_number,
                format_ts(&order.created_at),
                format_ts(&order.updated_at),
            ],
        )?;

        for item in items {
            tx.execute(
                r#"INSERT INTO order_item (
                    order_id, line_no, sku, item_name, quantity, item_type
                ) VALUES (?, ?, ?, ?, ?, ?)"#,
                params![
                    &item.order_id,
                    &item.line_no,
                    &item.sku,
                    &item.item_name,
                    &item.quantity,
                    item.item_type.to_db_str(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 按 order_id 查询订单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("SELECT {} FROM orders WHERE order_id = ?", ORDER_COLUMNS),
            params![order_id],
            Self::map_row,
        ) {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 批量查询多个订单的订单行
    ///
    /// # 返回
    /// - order_id -> 订单行列表 的映射(不存在的订单无条目)
    pub fn find_items_for_orders(
        &self,
        order_ids: &[String],
    ) -> RepositoryResult<HashMap<String, Vec<OrderItem>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;

        let sql = format!(
            r#"SELECT order_id, line_no, sku, item_name, quantity, item_type
               FROM order_item
               WHERE order_id IN ({})
               ORDER BY order_id, line_no"#,
            sql_placeholders(order_ids.len())
        );

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(rusqlite::params_from_iter(order_ids.iter()), Self::map_item_row)?
            .collect::<Result<Vec<OrderItem>, _>>()?;

        let mut map: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for item in items {
            map.entry(item.order_id.clone()).or_default().push(item);
        }
        Ok(map)
    }

    /// 查询待分类订单池(未绑 chunk、待拣选)
    pub fn list_claimable_pool(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {}
               FROM orders
               WHERE chunk_id IS NULL AND status = 'AWAITING_SHIPMENT'
               ORDER BY created_at"#,
            ORDER_COLUMNS
        ))?;

        let orders = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<Order>, _>>()?;

        Ok(orders)
    }

    /// 查询 chunk 内的订单(按格位号升序)
    pub fn find_by_chunk(&self, chunk_id: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {}
               FROM orders
               WHERE chunk_id = ?
               ORDER BY bin_number"#,
            ORDER_COLUMNS
        ))?;

        let orders = stmt
            .query_map(params![chunk_id], Self::map_row)?
            .collect::<Result<Vec<Order>, _>>()?;

        Ok(orders)
    }

    /// 个性化订单积压量(未绑 chunk、待拣选)
    pub fn count_personalized_backlog(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*) FROM orders
               WHERE personalized = 1 AND chunk_id IS NULL
                 AND status = 'AWAITING_SHIPMENT'"#,
            [],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 解绑待分配子批上的订单引用
    ///
    /// 重算前必须先清空 orders.bulk_batch_id,否则删除 PENDING 子批
    /// 会触发外键约束失败。只解绑未入拣选块的订单。
    pub fn clear_pending_bulk_refs(&self, batch_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let count = conn.execute(
            r#"UPDATE orders
               SET bulk_batch_id = NULL, updated_at = datetime('now', 'localtime')
               WHERE chunk_id IS NULL
                 AND bulk_batch_id IN (
                    SELECT bulk_batch_id FROM bulk_batch
                    WHERE batch_id = ? AND status = 'PENDING'
                 )"#,
            params![batch_id],
        )?;

        Ok(count)
    }

    /// 回写分类结果
    pub fn update_category(&self, order_id: &str, category: OrderCategory) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let updated = conn.execute(
            r#"UPDATE orders
               SET category = ?, updated_at = datetime('now', 'localtime')
               WHERE order_id = ?"#,
            params![category.to_db_str(), order_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }

        Ok(())
    }

    /// 批量绑定批量子批(仅限尚未进入 chunk 的订单)
    pub fn assign_bulk_batch(
        &self,
        order_ids: &[String],
        bulk_batch_id: &str,
    ) -> RepositoryResult<usize> {
        if order_ids.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;

        let sql = format!(
            r#"UPDATE orders
               SET bulk_batch_id = ?, updated_at = datetime('now', 'localtime')
               WHERE order_id IN ({}) AND chunk_id IS NULL"#,
            sql_placeholders(order_ids.len())
        );

        let mut bind: Vec<&dyn rusqlite::ToSql> = vec![&bulk_batch_id];
        for id in order_ids {
            bind.push(id);
        }

        let count = conn.execute(&sql, bind.as_slice())?;
        Ok(count)
    }

    /// 映射数据库行到 Order 对象
    pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Order> {
        Ok(Order {
            order_id: row.get(0)?,
            order_number: row.get(1)?,
            status: OrderStatus::from_str(&row.get::<_, String>(2)?),
            personalized: row.get::<_, i32>(3)? == 1,
            category: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| OrderCategory::from_str(&s)),
            batch_id: row.get(5)?,
            bulk_batch_id: row.get(6)?,
            chunk_id: row.get(7)?,
            bin_number: row.get(8)?,
            created_at: parse_ts(9, row.get::<_, String>(9)?)?,
            updated_at: parse_ts(10, row.get::<_, String>(10)?)?,
        })
    }

    /// 映射数据库行到 OrderItem 对象
    pub(crate) fn map_item_row(row: &rusqlite::Row) -> rusqlite::Result<OrderItem> {
        Ok(OrderItem {
            order_id: row.get(0)?,
            line_no: row.get(1)?,
            sku: row.get(2)?,
            item_name: row.get(3)?,
            quantity: row.get(4)?,
            item_type: ItemType::from_str(&row.get::<_, String>(5)?),
        })
    }
}
