// ==========================================
// 并发领取控制测试
// ==========================================
// 红线: 并发领取同一辆拣选车必须恰好一个成功;
//       并发领取同一批次不得出现订单重复分派
// ==========================================


#[cfg(test)]
mod concurrent_claim_test {
    use crate::test_helpers::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use wms_picking::app::AppState;
    use wms_picking::api::ClaimChunkRequest;
    use wms_picking::domain::types::BatchType;

    fn claim_req(cart_id: &str) -> ClaimChunkRequest {
        ClaimChunkRequest {
            cart_id: cart_id.to_string(),
            picker_name: "并发拣选员".to_string(),
            cell_id: Some("CELL-A".to_string()),
            personalized: false,
        }
    }

    fn seed_batch_with_orders(db_path: &str, order_count: usize) {
        let conn = open_conn(db_path);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-1", BatchType::Default, 0, false);
        assign_batch_to_cell(&conn, "B-1", "CELL-A", 1);
        for i in 0..order_count {
            insert_order(&conn, &format!("O-{:03}", i), "B-1", false, &[("SKU-1", 1)]);
        }
    }

    #[test]
    fn test_concurrent_claims_on_same_cart_exactly_one_succeeds() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state: Arc<AppState> = build_app(&db_path);
        {
            let conn = open_conn(&db_path);
            insert_cart(&conn, "CART-01", 12);
        }
        seed_batch_with_orders(&db_path, 30);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let state = state.clone();
            handles.push(thread::spawn(move || {
                state.picking_api.claim_chunk(&claim_req("CART-01")).is_ok()
            }));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);

        let conn = open_conn(&db_path);
        assert_eq!(cart_status(&conn, "CART-01"), "PICKING");
        let chunks: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunk", [], |row| row.get(0))
            .unwrap();
        assert_eq!(chunks, 1);
    }

    #[test]
    fn test_concurrent_claims_on_distinct_carts_do_not_share_orders() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state: Arc<AppState> = build_app(&db_path);
        {
            let conn = open_conn(&db_path);
            insert_cart(&conn, "CART-01", 12);
            insert_cart(&conn, "CART-02", 12);
            insert_cart(&conn, "CART-03", 12);
        }
        // 36 单恰好填满三辆 12 格的车
        seed_batch_with_orders(&db_path, 36);

        let mut handles = Vec::new();
        for cart_id in ["CART-01", "CART-02", "CART-03"] {
            let state = state.clone();
            handles.push(thread::spawn(move || {
                state.picking_api.claim_chunk(&claim_req(cart_id)).unwrap()
            }));
        }
        let chunks: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let conn = open_conn(&db_path);
        let mut seen: HashSet<String> = HashSet::new();
        for chunk in &chunks {
            assert_eq!(chunk.orders_in_chunk, 12);
            for (order_id, _) in chunk_orders(&conn, &chunk.chunk_id) {
                // 同一订单不得进入两个 chunk
                assert!(seen.insert(order_id));
            }
        }
        assert_eq!(seen.len(), 36);

        // chunk_number 批次内不重复
        let numbers: HashSet<i32> = chunks.iter().map(|c| c.chunk_number).collect();
        assert_eq!(numbers, HashSet::from([1, 2, 3]));

        let unassigned: i64 = conn
            .query_row("SELECT COUNT(*) FROM orders WHERE chunk_id IS NULL", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(unassigned, 0);
    }
}
