// ==========================================
// 仓储拣选编排系统 - 演示数据种子工具
// ==========================================
// 用法: seed_demo_db [db_path]
// 生成: 拣选车/拣选区/批次/库位 + 一批可分类订单, 随后跑一次池分类
// ==========================================

use chrono::Local;
use rusqlite::params;
use std::error::Error;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use wms_picking::app::{get_default_db_path, AppState};
use wms_picking::db::open_sqlite_connection;
use wms_picking::domain::types::{BatchStatus, BatchType};
use wms_picking::repository::format_ts;
use wms_picking::schema;

fn main() -> Result<(), Box<dyn Error>> {
    wms_picking::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("种子目标数据库: {}", db_path);

    reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    schema::init_schema(&conn)?;
    schema::seed_default_config(&conn)?;

    seed_warehouse(&conn)?;
    seed_orders(&conn)?;
    drop(conn);

    // 用正式入口装配, 跑一遍池分类, 种子数据即处于可领取状态
    let state = AppState::new(db_path, None).map_err(|e| -> Box<dyn Error> { e.into() })?;
    let summary = state.order_api.reclassify()?;
    tracing::info!(
        "分类完成 - total={}, bulk={}, single={}, order_by_size={}, personalized={}",
        summary.total,
        summary.bulk,
        summary.single,
        summary.order_by_size,
        summary.personalized
    );

    Ok(())
}

fn reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if path.exists() {
        let backup = format!("{}.bak", db_path);
        fs::copy(path, &backup)?;
        fs::remove_file(path)?;
        tracing::info!("旧数据库已备份到: {}", backup);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn seed_warehouse(conn: &rusqlite::Connection) -> Result<(), Box<dyn Error>> {
    // 拣选车: 2 辆标准 12 格 + 1 辆大件 6 格
    for (id, name, capacity) in [
        ("CART-01", "1号车", 12),
        ("CART-02", "2号车", 12),
        ("CART-03", "大件车", 6),
    ] {
        conn.execute(
            "INSERT INTO cart (cart_id, cart_name, bin_capacity, is_active, status) VALUES (?, ?, ?, 1, 'AVAILABLE')",
            params![id, name, capacity],
        )?;
    }

    // 拣选区
    for (id, name) in [("CELL-A", "A区"), ("CELL-B", "B区")] {
        conn.execute(
            "INSERT INTO cell (cell_id, cell_name, is_active) VALUES (?, ?, 1)",
            params![id, name],
        )?;
    }

    // 批次: 单品 / 批量 / 默认 / 个性化
    let now = format_ts(&Local::now().naive_local());
    for (id, name, batch_type, priority, personalized) in [
        ("BATCH-SINGLES", "单品批次", BatchType::Singles, 10, false),
        ("BATCH-BULK", "批量批次", BatchType::Bulk, 20, false),
        ("BATCH-DEFAULT", "常规批次", BatchType::Default, 5, false),
        ("BATCH-PERSONAL", "刻字批次", BatchType::Default, 30, true),
    ] {
        conn.execute(
            r#"INSERT INTO batch (batch_id, batch_name, batch_type, priority, status, personalized, oversized, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)"#,
            params![
                id,
                name,
                batch_type.to_db_str(),
                priority,
                BatchStatus::Active.to_db_str(),
                personalized as i32,
                &now,
                &now
            ],
        )?;
    }

    // 批次路由: A区走单品+批量, B区走常规
    for (batch_id, cell_id, priority) in [
        ("BATCH-SINGLES", "CELL-A", 1),
        ("BATCH-BULK", "CELL-A", 2),
        ("BATCH-DEFAULT", "CELL-B", 1),
    ] {
        conn.execute(
            "INSERT INTO batch_cell_assignment (batch_id, cell_id, priority) VALUES (?, ?, ?)",
            params![batch_id, cell_id, priority],
        )?;
    }

    // 库位
    for (sku, location) in [
        ("MUG-RED", "A-01-01"),
        ("MUG-WHITE", "A-01-02"),
        ("MUG-GREEN", "A-01-03"),
        ("TUMBLER-20", "B-02-01"),
        ("TUMBLER-30", "B-02-02"),
        ("BOTTLE-XL", "C-03-01"),
    ] {
        conn.execute(
            "INSERT INTO sku_location (sku, bin_location) VALUES (?, ?)",
            params![sku, location],
        )?;
    }

    Ok(())
}

fn seed_orders(conn: &rusqlite::Connection) -> Result<(), Box<dyn Error>> {
    let now = format_ts(&Local::now().naive_local());

    let mut insert_order = |order_number: &str,
                            batch_id: &str,
                            personalized: bool,
                            items: &[(&str, i32)]|
     -> Result<(), Box<dyn Error>> {
        let order_id = Uuid::new_v4().to_string();
        conn.execute(
            r#"INSERT INTO orders (order_id, order_number, status, personalized, batch_id, created_at, updated_at)
               VALUES (?, ?, 'AWAITING_SHIPMENT', ?, ?, ?, ?)"#,
            params![&order_id, order_number, personalized as i32, batch_id, &now, &now],
        )?;
        for (line_no, (sku, quantity)) in items.iter().enumerate() {
            conn.execute(
                r#"INSERT INTO order_item (order_id, line_no, sku, item_name, quantity, item_type)
                   VALUES (?, ?, ?, ?, ?, 'PHYSICAL')"#,
                params![&order_id, (line_no + 1) as i32, sku, sku, quantity],
            )?;
        }
        Ok(())
    };

    // 单品订单: 同 SKU 聚堆, SINGLES 模式按主导 SKU 分组
    for i in 0..30 {
        let sku = if i % 2 == 0 { "MUG-RED" } else { "MUG-WHITE" };
        insert_order(&format!("S-{:04}", i), "BATCH-SINGLES", false, &[(sku, 1)])?;
    }

    // 批量订单: 同签名 2 件套 x 10 单, 超过 bulk_threshold=4
    for i in 0..10 {
        insert_order(
            &format!("B-{:04}", i),
            "BATCH-BULK",
            false,
            &[("TUMBLER-20", 1), ("TUMBLER-30", 1)],
        )?;
    }

    // 常规订单: 大小混合
    for i in 0..8 {
        insert_order(
            &format!("D-{:04}", i),
            "BATCH-DEFAULT",
            false,
            &[("BOTTLE-XL", 2), ("MUG-GREEN", 3)],
        )?;
    }

    // 个性化订单
    for i in 0..5 {
        insert_order(
            &format!("P-{:04}", i),
            "BATCH-PERSONAL",
            true,
            &[("MUG-GREEN", 1)],
        )?;
    }

    tracing::info!("订单种子完成 - singles=30, bulk=10, default=8, personalized=5");
    Ok(())
}
