// ==========================================
// 仓储拣选编排系统 - 拣选车数据仓储
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Cart
// 红线: 领取事务内的状态检查与翻转在引擎层完成,
//       此处的 update_status 只服务于生命周期收尾与运维
// ==========================================

use crate::domain::cart::Cart;
use crate::domain::types::CartStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 拣选车 SELECT 列(与 map_row 对齐)
pub(crate) const CART_COLUMNS: &str = "cart_id, cart_name, bin_capacity, is_active, status";

// ==========================================
// CartRepository - 拣选车仓储
// ==========================================
pub struct CartRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CartRepository {
    /// 创建新的 CartRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建拣选车
    pub fn insert(&self, cart: &Cart) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO cart (cart_id, cart_name, bin_capacity, is_active, status)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                &cart.cart_id,
                &cart.cart_name,
                &cart.bin_capacity,
                cart.is_active as i32,
                cart.status.to_db_str(),
            ],
        )?;

        Ok(cart.cart_id.clone())
    }

    /// 按 cart_id 查询拣选车
    pub fn find_by_id(&self, cart_id: &str) -> RepositoryResult<Option<Cart>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("SELECT {} FROM cart WHERE cart_id = ?", CART_COLUMNS),
            params![cart_id],
            Self::map_row,
        ) {
            Ok(cart) => Ok(Some(cart)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询空闲可用的拣选车
    pub fn list_available(&self) -> RepositoryResult<Vec<Cart>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {}
               FROM cart
               WHERE is_active = 1 AND status = 'AVAILABLE'
               ORDER BY cart_name"#,
            CART_COLUMNS
        ))?;

        let carts = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<Cart>, _>>()?;

        Ok(carts)
    }

    /// 更新拣选车状态
    pub fn update_status(&self, cart_id: &str, status: CartStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "UPDATE cart SET status = ? WHERE cart_id = ?",
            params![status.to_db_str(), cart_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Cart".to_string(),
                id: cart_id.to_string(),
            });
        }

        Ok(())
    }

    /// 映射数据库行到 Cart 对象
    pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Cart> {
        Ok(Cart {
            cart_id: row.get(0)?,
            cart_name: row.get(1)?,
            bin_capacity: row.get(2)?,
            is_active: row.get::<_, i32>(3)? == 1,
            status: CartStatus::from_str(&row.get::<_, String>(4)?),
        })
    }
}
