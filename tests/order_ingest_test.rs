// ==========================================
// 订单接入与池重分类测试
// ==========================================
// 覆盖: 原始载荷归一化(对象或数组)、行类型标准化、
//       分类优先级、批量子批重建与订单绑定
// ==========================================


#[cfg(test)]
mod order_ingest_test {
    use crate::test_helpers::*;
    use serde_json::json;
    use wms_picking::api::ApiError;
    use wms_picking::domain::types::BatchType;

    #[test]
    fn test_ingest_accepts_object_or_array() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        // 单个对象
        let single = state
            .order_api
            .ingest(json!({
                "order_number": "SO-1001",
                "items": [{"sku": "MUG-RED", "quantity": 2}]
            }))
            .unwrap();
        assert_eq!(single.ingested, 1);
        // 缺失的 order_id 自动生成
        assert!(!single.order_ids[0].is_empty());

        // 对象数组
        let batch = state
            .order_api
            .ingest(json!([
                {"order_number": "SO-1002", "items": [{"sku": "MUG-RED"}]},
                {"order_number": "SO-1003", "personalized": true,
                 "items": [{"sku": "MUG-CUSTOM", "quantity": 1}]}
            ]))
            .unwrap();
        assert_eq!(batch.ingested, 2);

        let conn = open_conn(&db_path);
        let (count, awaiting): (i64, i64) = conn
            .query_row(
                r#"SELECT COUNT(*),
                          SUM(CASE WHEN status = 'AWAITING_SHIPMENT' THEN 1 ELSE 0 END)
                   FROM orders"#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!((count, awaiting), (3, 3));
        // 未给 quantity 的行默认为 1
        let qty: i32 = conn
            .query_row(
                r#"SELECT i.quantity FROM order_item i
                   JOIN orders o ON o.order_id = i.order_id
                   WHERE o.order_number = 'SO-1002'"#,
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(qty, 1);
    }

    #[test]
    fn test_ingest_normalizes_item_types() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        state
            .order_api
            .ingest(json!({
                "order_number": "SO-2001",
                "items": [
                    {"sku": "MUG-RED", "quantity": 1},
                    {"sku": "FEE-1", "quantity": 1, "type": "Freight Insurance"},
                    {"sku": "FEE-2", "quantity": 1, "type": "Expedited Shipping"}
                ]
            }))
            .unwrap();

        let conn = open_conn(&db_path);
        let type_of = |sku: &str| -> String {
            conn.query_row(
                "SELECT item_type FROM order_item WHERE sku = ?",
                rusqlite::params![sku],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(type_of("MUG-RED"), "PHYSICAL");
        assert_eq!(type_of("FEE-1"), "INSURANCE");
        assert_eq!(type_of("FEE-2"), "SHIPPING");
    }

    #[test]
    fn test_ingest_rejects_bad_payloads() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        // 标量载荷
        let err = state.order_api.ingest(json!("not an order")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        // 空订单行
        let err = state
            .order_api
            .ingest(json!({"order_number": "SO-3001", "items": []}))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        // 非正数量
        let err = state
            .order_api
            .ingest(json!({
                "order_number": "SO-3002",
                "items": [{"sku": "MUG-RED", "quantity": 0}]
            }))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_reclassify_applies_category_priority() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_batch(&conn, "B-BULK", BatchType::Bulk, 0, false);
        // 5 个同构双品订单: 超过阈值(4) -> BULK
        for i in 0..5 {
            insert_order(
                &conn,
                &format!("BK-{}", i),
                "B-BULK",
                false,
                &[("TUMBLER-20", 1), ("TUMBLER-30", 1)],
            );
        }
        // 个性化优先于一切
        insert_order(&conn, "P-1", "B-BULK", true, &[("MUG-CUSTOM", 1)]);
        // 单品单件
        insert_order(&conn, "S-1", "B-BULK", false, &[("MUG-RED", 1)]);
        insert_order(&conn, "S-2", "B-BULK", false, &[("MUG-GREEN", 1)]);
        // 多件且无同构伙伴 -> 默认
        insert_order(&conn, "D-1", "B-BULK", false, &[("BOTTLE-XL", 3)]);

        let summary = state.order_api.reclassify().unwrap();
        assert_eq!(summary.total, 9);
        assert_eq!(summary.bulk, 5);
        assert_eq!(summary.personalized, 1);
        assert_eq!(summary.single, 2);
        assert_eq!(summary.order_by_size, 1);
        assert_eq!(summary.bulk_batches_rebuilt, 1);

        let category_of = |order_number: &str| -> String {
            conn.query_row(
                "SELECT category FROM orders WHERE order_number = ?",
                rusqlite::params![order_number],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(category_of("P-1"), "PERSONALIZED");
        assert_eq!(category_of("S-1"), "SINGLE");
        assert_eq!(category_of("D-1"), "ORDER_BY_SIZE");
        assert_eq!(category_of("BK-0"), "BULK");

        // BULK 订单绑定到子批
        let bound: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM orders WHERE bulk_batch_id IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(bound, 5);
    }

    #[test]
    fn test_single_is_terminal_despite_duplicates() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_batch(&conn, "B-BULK", BatchType::Bulk, 0, false);
        // 6 个完全相同的单品单件订单: 重复数超过阈值也不升级为 BULK
        for i in 0..6 {
            insert_order(&conn, &format!("S-{}", i), "B-BULK", false, &[("MUG-RED", 1)]);
        }

        let summary = state.order_api.reclassify().unwrap();
        assert_eq!(summary.single, 6);
        assert_eq!(summary.bulk, 0);
        assert_eq!(summary.bulk_batches_rebuilt, 0);
    }

    #[test]
    fn test_bulk_rebuild_splits_large_signature_group() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_batch(&conn, "B-BULK", BatchType::Bulk, 0, false);
        // 30 个同构订单, 切分容量 24 -> 两个均衡子批 [15, 15]
        for i in 0..30 {
            insert_order(
                &conn,
                &format!("BK-{:02}", i),
                "B-BULK",
                false,
                &[("TUMBLER-20", 1), ("TUMBLER-30", 1)],
            );
        }

        let summary = state.order_api.reclassify().unwrap();
        assert_eq!(summary.bulk, 30);
        assert_eq!(summary.bulk_batches_rebuilt, 2);

        let mut stmt = conn
            .prepare("SELECT bulk_batch_id, order_count FROM bulk_batch ORDER BY split_index")
            .unwrap();
        let sub_batches: Vec<(String, i32)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(sub_batches.len(), 2);
        assert_eq!(sub_batches[0].1, 15);
        assert_eq!(sub_batches[1].1, 15);

        // 绑定数量与子批声明一致
        for (bulk_batch_id, order_count) in &sub_batches {
            let bound: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM orders WHERE bulk_batch_id = ?",
                    rusqlite::params![bulk_batch_id],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(bound, *order_count as i64);
        }
    }

    #[test]
    fn test_reclassify_keeps_assigned_sub_batches() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_cart(&conn, "CART-01", 12);
        insert_cell(&conn, "CELL-A");
        insert_batch(&conn, "B-BULK", BatchType::Bulk, 0, false);
        assign_batch_to_cell(&conn, "B-BULK", "CELL-A", 1);
        for i in 0..5 {
            insert_order(
                &conn,
                &format!("BK-{}", i),
                "B-BULK",
                false,
                &[("TUMBLER-20", 1), ("TUMBLER-30", 1)],
            );
        }
        state.order_api.reclassify().unwrap();

        // 领取后子批已绑 chunk, 再次重分类不得动它
        let chunk = state
            .picking_api
            .claim_chunk(&wms_picking::api::ClaimChunkRequest {
                cart_id: "CART-01".to_string(),
                picker_name: "测试拣选员".to_string(),
                cell_id: Some("CELL-A".to_string()),
                personalized: false,
            })
            .unwrap();
        state.order_api.reclassify().unwrap();

        let (status, links): (String, i64) = conn
            .query_row(
                r#"SELECT b.status,
                          (SELECT COUNT(*) FROM chunk_bulk_batch WHERE chunk_id = ?)
                   FROM bulk_batch b"#,
                rusqlite::params![&chunk.chunk_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "ASSIGNED");
        assert_eq!(links, 1);
    }

    #[test]
    fn test_reclassify_rerun_rebuilds_pending_sub_batches() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);
        let conn = open_conn(&db_path);

        insert_batch(&conn, "B-BULK", BatchType::Bulk, 0, false);
        for i in 0..5 {
            insert_order(
                &conn,
                &format!("BK-{}", i),
                "B-BULK",
                false,
                &[("TUMBLER-20", 1), ("TUMBLER-30", 1)],
            );
        }
        state.order_api.reclassify().unwrap();

        // 池子里进了新的同构订单, 重算必须把旧 PENDING 子批整组重建
        insert_order(
            &conn,
            "BK-5",
            "B-BULK",
            false,
            &[("TUMBLER-20", 1), ("TUMBLER-30", 1)],
        );
        let summary = state.order_api.reclassify().unwrap();
        assert_eq!(summary.bulk, 6);
        assert_eq!(summary.bulk_batches_rebuilt, 1);

        let (sub_batches, order_count, bound): (i64, i32, i64) = conn
            .query_row(
                r#"SELECT (SELECT COUNT(*) FROM bulk_batch),
                          (SELECT order_count FROM bulk_batch),
                          (SELECT COUNT(*) FROM orders WHERE bulk_batch_id IS NOT NULL)"#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(sub_batches, 1);
        assert_eq!(order_count, 6);
        assert_eq!(bound, 6);
    }
}
