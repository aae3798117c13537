// ==========================================
// 仓储拣选编排系统 - 拣选区数据仓储
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Cell
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::batch::{BatchCellAssignment, Cell};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// CellRepository - 拣选区仓储
// ==========================================
pub struct CellRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CellRepository {
    /// 创建新的 CellRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建拣选区
    pub fn insert(&self, cell: &Cell) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            "INSERT INTO cell (cell_id, cell_name, is_active) VALUES (?, ?, ?)",
            params![&cell.cell_id, &cell.cell_name, cell.is_active as i32],
        )?;

        Ok(cell.cell_id.clone())
    }

    /// 按 cell_id 查询拣选区
    pub fn find_by_id(&self, cell_id: &str) -> RepositoryResult<Option<Cell>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            "SELECT cell_id, cell_name, is_active FROM cell WHERE cell_id = ?",
            params![cell_id],
            Self::map_row,
        ) {
            Ok(cell) => Ok(Some(cell)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有启用的拣选区
    pub fn list_active(&self) -> RepositoryResult<Vec<Cell>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT cell_id, cell_name, is_active FROM cell WHERE is_active = 1 ORDER BY cell_name",
        )?;

        let cells = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<Cell>, _>>()?;

        Ok(cells)
    }

    /// 新增批次路由
    pub fn insert_assignment(&self, assignment: &BatchCellAssignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO batch_cell_assignment (batch_id, cell_id, priority)
               VALUES (?, ?, ?)"#,
            params![
                &assignment.batch_id,
                &assignment.cell_id,
                &assignment.priority
            ],
        )?;

        Ok(())
    }

    /// 查询拣选区的批次路由(priority 升序)
    pub fn find_assignments_for_cell(
        &self,
        cell_id: &str,
    ) -> RepositoryResult<Vec<BatchCellAssignment>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT batch_id, cell_id, priority
               FROM batch_cell_assignment
               WHERE cell_id = ?
               ORDER BY priority"#,
        )?;

        let assignments = stmt
            .query_map(params![cell_id], |row| {
                Ok(BatchCellAssignment {
                    batch_id: row.get(0)?,
                    cell_id: row.get(1)?,
                    priority: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<BatchCellAssignment>, _>>()?;

        Ok(assignments)
    }

    /// 映射数据库行到 Cell 对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Cell> {
        Ok(Cell {
            cell_id: row.get(0)?,
            cell_name: row.get(1)?,
            is_active: row.get::<_, i32>(2)? == 1,
        })
    }
}
