// ==========================================
// 仓储拣选编排系统 - 数据库 Schema 初始化
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型
// 职责: 建表（幂等）、写入 schema_version、填充 global 配置 scope
// 红线: DDL 只在此处维护，测试与生产共用同一份
// ==========================================

use crate::db::CURRENT_SCHEMA_VERSION;
use rusqlite::Connection;

/// 初始化数据库 schema（幂等）
///
/// 所有表使用 `CREATE TABLE IF NOT EXISTS`，可在已初始化的库上重复执行。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- ===== 基础设施表 =====
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        -- ===== 订单域 =====
        CREATE TABLE IF NOT EXISTS orders (
            order_id TEXT PRIMARY KEY,
            order_number TEXT NOT NULL,
            status TEXT NOT NULL,
            personalized INTEGER NOT NULL DEFAULT 0,
            -- 分类结果（初始为 NULL，由分类引擎回写）
            category TEXT,
            batch_id TEXT REFERENCES batch(batch_id),
            bulk_batch_id TEXT REFERENCES bulk_batch(bulk_batch_id),
            chunk_id TEXT REFERENCES chunk(chunk_id),
            bin_number INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_orders_chunk ON orders(chunk_id);
        CREATE INDEX IF NOT EXISTS idx_orders_batch_unassigned ON orders(batch_id, chunk_id, status);

        CREATE TABLE IF NOT EXISTS order_item (
            order_id TEXT NOT NULL REFERENCES orders(order_id) ON DELETE CASCADE,
            line_no INTEGER NOT NULL,
            sku TEXT NOT NULL,
            item_name TEXT,
            quantity INTEGER NOT NULL,
            -- PHYSICAL / INSURANCE / SHIPPING（入库时归一化）
            item_type TEXT NOT NULL DEFAULT 'PHYSICAL',
            PRIMARY KEY (order_id, line_no)
        );

        -- ===== 批次域 =====
        CREATE TABLE IF NOT EXISTS batch (
            batch_id TEXT PRIMARY KEY,
            batch_name TEXT NOT NULL,
            batch_type TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            personalized INTEGER NOT NULL DEFAULT 0,
            oversized INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bulk_batch (
            bulk_batch_id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES batch(batch_id) ON DELETE CASCADE,
            signature TEXT NOT NULL,
            split_index INTEGER NOT NULL,
            order_count INTEGER NOT NULL,
            sku_layout_json TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bulk_batch_pending ON bulk_batch(batch_id, status, split_index);

        -- ===== 拣选域 =====
        CREATE TABLE IF NOT EXISTS chunk (
            chunk_id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES batch(batch_id),
            chunk_number INTEGER NOT NULL,
            picking_mode TEXT NOT NULL,
            status TEXT NOT NULL,
            cart_id TEXT NOT NULL REFERENCES cart(cart_id),
            picker_name TEXT NOT NULL,
            orders_in_chunk INTEGER NOT NULL DEFAULT 0,
            orders_skipped INTEGER NOT NULL DEFAULT 0,
            claimed_at TEXT NOT NULL,
            pick_started_at TEXT,
            pick_completed_at TEXT,
            cancel_reason TEXT,
            -- 刻字子流程（仅个性化 chunk 使用）
            engraver_name TEXT,
            engraving_started_at TEXT,
            engraving_completed_at TEXT,
            engraving_progress_json TEXT,
            items_engraved INTEGER NOT NULL DEFAULT 0,
            UNIQUE(batch_id, chunk_number)
        );

        CREATE TABLE IF NOT EXISTS chunk_bulk_batch (
            chunk_id TEXT NOT NULL REFERENCES chunk(chunk_id) ON DELETE CASCADE,
            bulk_batch_id TEXT NOT NULL REFERENCES bulk_batch(bulk_batch_id),
            shelf_number INTEGER NOT NULL,
            PRIMARY KEY (chunk_id, bulk_batch_id)
        );

        CREATE TABLE IF NOT EXISTS cart (
            cart_id TEXT PRIMARY KEY,
            cart_name TEXT NOT NULL,
            bin_capacity INTEGER NOT NULL DEFAULT 12,
            is_active INTEGER NOT NULL DEFAULT 1,
            status TEXT NOT NULL DEFAULT 'AVAILABLE'
        );

        CREATE TABLE IF NOT EXISTS cell (
            cell_id TEXT PRIMARY KEY,
            cell_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS batch_cell_assignment (
            batch_id TEXT NOT NULL REFERENCES batch(batch_id) ON DELETE CASCADE,
            cell_id TEXT NOT NULL REFERENCES cell(cell_id) ON DELETE CASCADE,
            priority INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (batch_id, cell_id)
        );

        -- ===== 库位解析（默认解析器后备表）=====
        CREATE TABLE IF NOT EXISTS sku_location (
            sku TEXT PRIMARY KEY,
            bin_location TEXT NOT NULL
        );
        "#,
    )?;

    // 写入 schema_version（幂等）
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    // 插入 global scope
    conn.execute(
        r#"INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
           VALUES ('global', 'GLOBAL', 'global')"#,
        [],
    )?;

    Ok(())
}

/// 写入默认配置（仅当 key 不存在时）
///
/// 配置全集见 Picking_Engine_Specs_v0.2.md - 11. 配置项
pub fn seed_default_config(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT OR IGNORE INTO config_kv (scope_id, key, value) VALUES
        ('global', 'bulk_threshold', '4'),
        ('global', 'max_bins_standard', '12'),
        ('global', 'max_bins_oversized', '6'),
        ('global', 'orders_per_bin', '24'),
        ('global', 'shelves_per_chunk', '3'),
        ('global', 'bulk_split_capacity', '24'),
        ('global', 'label_service_url', ''),
        ('global', 'http_port', '8090')
        "#,
        [],
    )?;

    Ok(())
}
