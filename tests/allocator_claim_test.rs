// ==========================================
// 领取分配引擎测试
// ==========================================
// 覆盖: 三种拣选模式的订单选择与格位分配、批次路由、
//       前置条件校验、chunk_number 单调性
// ==========================================


#[cfg(test)]
mod allocator_claim_test {
    use crate::test_helpers::*;
    use std::collections::HashSet;
    use wms_picking::api::{ApiError, ClaimChunkRequest};
    use wms_picking::domain::types::{BatchType, PickingMode};

    fn claim_req(cart_id: &str, cell_id: &str) -> ClaimChunkRequest {
        ClaimChunkRequest {
            cart_id: cart_id.to_string(),
            picker_name: "测试拣选员".to_string(),
            cell_id: Some(cell_id.to_string()),
            personalized: false,
        }
    }

    #[test]
    fn test_claim_singles_groups_by_dominant_sku() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-SINGLES", BatchType::Singles, 10, false);
        assign_batch_to_cell(&conn, "B-SINGLES", "CELL-A", 1);
        // MUG-B 的库位排在 MUG-A 之前
        insert_sku_location(&conn, "MUG-A", "B-02-01");
        insert_sku_location(&conn, "MUG-B", "A-01-01");
        for i in 0..3 {
            insert_order(&conn, &format!("SA-{}", i), "B-SINGLES", false, &[("MUG-A", 1)]);
        }
        for i in 0..2 {
            insert_order(&conn, &format!("SB-{}", i), "B-SINGLES", false, &[("MUG-B", 1)]);
        }

        let chunk = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        assert_eq!(chunk.picking_mode, PickingMode::Singles);
        assert_eq!(chunk.orders_in_chunk, 5);
        assert_eq!(chunk.chunk_number, 1);

        // 同 SKU 共享格位, 库位靠前的 SKU 拿 1 号格
        let bin_for = |sku: &str| -> HashSet<i32> {
            let mut stmt = conn
                .prepare(
                    r#"SELECT DISTINCT o.bin_number FROM orders o
                       JOIN order_item i ON i.order_id = o.order_id
                       WHERE o.chunk_id = ? AND i.sku = ?"#,
                )
                .unwrap();
            stmt.query_map(rusqlite::params![&chunk.chunk_id, sku], |row| row.get(0))
                .unwrap()
                .collect::<Result<HashSet<i32>, _>>()
                .unwrap()
        };
        assert_eq!(bin_for("MUG-B"), HashSet::from([1]));
        assert_eq!(bin_for("MUG-A"), HashSet::from([2]));

        assert_eq!(cart_status(&conn, "CART-01"), "PICKING");
        assert_eq!(batch_status(&conn, "B-SINGLES"), "IN_PROGRESS");
    }

    #[test]
    fn test_claim_singles_caps_groups_at_max_bins() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-SINGLES", BatchType::Singles, 10, false);
        assign_batch_to_cell(&conn, "B-SINGLES", "CELL-A", 1);
        // 13 个不同 SKU, 默认车 12 格, 最后一组进不了本 chunk
        for i in 0..13 {
            insert_order(
                &conn,
                &format!("SO-{:02}", i),
                "B-SINGLES",
                false,
                &[(&format!("SKU-{:02}", i), 1)],
            );
        }

        let chunk = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        assert_eq!(chunk.orders_in_chunk, 12);

        let unassigned: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM orders WHERE chunk_id IS NULL AND status = 'AWAITING_SHIPMENT'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(unassigned, 1);

        let bins = chunk_orders(&conn, &chunk.chunk_id);
        let bin_numbers: Vec<i32> = bins.iter().map(|(_, b)| *b).collect();
        assert_eq!(bin_numbers, (1..=12).collect::<Vec<i32>>());
    }

    #[test]
    fn test_claim_by_size_sorts_by_location_with_sentinel() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-DEFAULT", BatchType::Default, 5, false);
        assign_batch_to_cell(&conn, "B-DEFAULT", "CELL-A", 1);
        insert_sku_location(&conn, "BOTTLE", "C-03-01");
        insert_sku_location(&conn, "MUG", "A-01-01");
        // TUMBLER 无库位记录, 回退哨兵排在末尾
        let o_bottle = insert_order(&conn, "D-1", "B-DEFAULT", false, &[("BOTTLE", 2)]);
        let o_mug = insert_order(&conn, "D-2", "B-DEFAULT", false, &[("MUG", 1)]);
        let o_tumbler = insert_order(&conn, "D-3", "B-DEFAULT", false, &[("TUMBLER", 1)]);

        let chunk = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        assert_eq!(chunk.picking_mode, PickingMode::OrderBySize);
        assert_eq!(chunk.orders_in_chunk, 3);

        let assigned = chunk_orders(&conn, &chunk.chunk_id);
        assert_eq!(assigned, vec![(o_mug, 1), (o_bottle, 2), (o_tumbler, 3)]);
    }

    #[test]
    fn test_claim_bulk_binds_shelves_and_flips_bulk_batch() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-BULK", BatchType::Bulk, 20, false);
        assign_batch_to_cell(&conn, "B-BULK", "CELL-A", 1);
        // 5 个同构订单, 超过批量阈值(4), 重分类后生成一个子批
        for i in 0..5 {
            insert_order(
                &conn,
                &format!("BK-{}", i),
                "B-BULK",
                false,
                &[("TUMBLER-20", 1), ("TUMBLER-30", 1)],
            );
        }
        let summary = state.order_api.reclassify().unwrap();
        assert_eq!(summary.bulk, 5);
        assert_eq!(summary.bulk_batches_rebuilt, 1);

        let chunk = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        assert_eq!(chunk.picking_mode, PickingMode::Bulk);
        assert_eq!(chunk.orders_in_chunk, 5);

        // 货架绑定 + 子批翻转 ASSIGNED
        let (bound_chunk, shelf): (String, i32) = conn
            .query_row(
                "SELECT chunk_id, shelf_number FROM chunk_bulk_batch",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(bound_chunk, chunk.chunk_id);
        assert_eq!(shelf, 1);
        let bb_status: String = conn
            .query_row("SELECT status FROM bulk_batch", [], |row| row.get(0))
            .unwrap();
        assert_eq!(bb_status, "ASSIGNED");

        // 格位号跨货架全局递增, 从 1 开始连续
        let bins: Vec<i32> = chunk_orders(&conn, &chunk.chunk_id)
            .iter()
            .map(|(_, b)| *b)
            .collect();
        assert_eq!(bins, vec![1, 2, 3, 4, 5]);

        // 详情接口带出货架绑定和子批
        let detail = state.picking_api.get_chunk(&chunk.chunk_id).unwrap();
        assert_eq!(detail.orders.len(), 5);
        assert_eq!(detail.shelves.len(), 1);
        assert_eq!(detail.shelves[0].shelf_number, 1);
        assert_eq!(detail.shelves[0].bulk_batch.order_count, 5);
    }

    #[test]
    fn test_claim_caps_bins_at_cart_capacity() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        // 小车只有 4 格, 配置上限 12 不得突破物理格数
        insert_cart(&conn, "CART-SMALL", 4);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-1", BatchType::Default, 0, false);
        assign_batch_to_cell(&conn, "B-1", "CELL-A", 1);
        for i in 0..10 {
            let sku = format!("SKU-{:02}", i);
            insert_order(
                &conn,
                &format!("SO-{:02}", i),
                "B-1",
                false,
                &[(sku.as_str(), 1)],
            );
        }

        let chunk = state
            .picking_api
            .claim_chunk(&claim_req("CART-SMALL", "CELL-A"))
            .unwrap();
        assert_eq!(chunk.orders_in_chunk, 4);

        let bins: Vec<i32> = chunk_orders(&conn, &chunk.chunk_id)
            .iter()
            .map(|(_, b)| *b)
            .collect();
        assert_eq!(bins, vec![1, 2, 3, 4]);
        let unclaimed: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM orders WHERE chunk_id IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(unclaimed, 6);
    }

    #[test]
    fn test_claim_routes_by_cell_assignment_priority() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-LOW", BatchType::Default, 0, false);
        insert_batch(&conn, "B-HIGH", BatchType::Default, 0, false);
        // 路由优先级数字越小越优先
        assign_batch_to_cell(&conn, "B-LOW", "CELL-A", 5);
        assign_batch_to_cell(&conn, "B-HIGH", "CELL-A", 1);
        insert_order(&conn, "L-1", "B-LOW", false, &[("SKU-L", 1)]);
        insert_order(&conn, "H-1", "B-HIGH", false, &[("SKU-H", 1)]);

        let chunk = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        assert_eq!(chunk.batch_id, "B-HIGH");
    }

    #[test]
    fn test_claim_without_orders_is_state_conflict() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-EMPTY", BatchType::Default, 0, false);
        assign_batch_to_cell(&conn, "B-EMPTY", "CELL-A", 1);

        let err = state
            .picking_api
            .claim_chunk(&claim_req("CART-01", "CELL-A"))
            .unwrap_err();
        assert!(matches!(err, ApiError::StateConflict(_)));
        // 失败领取不得留下副作用
        assert_eq!(cart_status(&conn, "CART-01"), "AVAILABLE");
        let chunks: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunk", [], |row| row.get(0))
            .unwrap();
        assert_eq!(chunks, 0);
    }

    #[test]
    fn test_claim_with_occupied_cart_is_state_conflict() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        conn.execute("UPDATE cart SET status = 'PICKING' WHERE cart_id = 'CART-01'", [])
            .unwrap();
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-1", BatchType::Default, 0, false);
        assign_batch_to_cell(&conn, "B-1", "CELL-A", 1);
        insert_order(&conn, "O-1", "B-1", false, &[("SKU-1", 1)]);

        let err = state
            .picking_api
            .claim_chunk(&claim_req("CART-01", "CELL-A"))
            .unwrap_err();
        assert!(matches!(err, ApiError::StateConflict(_)));
    }

    #[test]
    fn test_claim_missing_cell_id_rejected_before_transaction() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        let req = ClaimChunkRequest {
            cart_id: "CART-01".to_string(),
            picker_name: "测试拣选员".to_string(),
            cell_id: None,
            personalized: false,
        };
        let err = state.picking_api.claim_chunk(&req).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_chunk_number_is_monotonic_within_batch() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-1", BatchType::Default, 0, false);
        assign_batch_to_cell(&conn, "B-1", "CELL-A", 1);
        for i in 0..3 {
            insert_order(&conn, &format!("O-{}", i), "B-1", false, &[("SKU-1", 1)]);
        }

        let first = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        assert_eq!(first.chunk_number, 1);

        // 取消后重领, 序号不回收
        state.picking_api.cancel_chunk(&first.chunk_id, Some("测试")).unwrap();
        let second = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        assert_eq!(second.chunk_number, 2);
    }

    #[test]
    fn test_two_claims_never_share_orders() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cart(&conn, "CART-02", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-1", BatchType::Default, 0, false);
        assign_batch_to_cell(&conn, "B-1", "CELL-A", 1);
        // 超过一车容量, 两次领取必须是互斥的订单集合
        for i in 0..20 {
            insert_order(&conn, &format!("O-{:02}", i), "B-1", false, &[("SKU-1", 1)]);
        }

        let c1 = state.picking_api.claim_chunk(&claim_req("CART-01", "CELL-A")).unwrap();
        let c2 = state.picking_api.claim_chunk(&claim_req("CART-02", "CELL-A")).unwrap();
        assert_eq!(c1.orders_in_chunk, 12);
        assert_eq!(c2.orders_in_chunk, 8);

        let ids1: HashSet<String> = chunk_orders(&conn, &c1.chunk_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let ids2: HashSet<String> = chunk_orders(&conn, &c2.chunk_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert!(ids1.is_disjoint(&ids2));
    }
}
