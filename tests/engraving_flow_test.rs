// ==========================================
// 个性化刻字链路测试
// ==========================================
// 状态机: PICKING -> READY_FOR_ENGRAVING -> ENGRAVING -> READY_FOR_SHIPPING
// 红线: 个性化拣毕不释放拣选车; 刻字取消仅在零件已刻时允许
// ==========================================


#[cfg(test)]
mod engraving_flow_test {
    use crate::test_helpers::*;
    use std::sync::Arc;
    use wms_picking::api::{ApiError, ClaimChunkRequest, EngravingCheckpointRequest};
    use wms_picking::app::AppState;
    use wms_picking::domain::chunk::Chunk;
    use wms_picking::domain::types::BatchType;

    /// 建一个 3 单的个性化 chunk, 已拣毕待刻字
    fn setup_ready_for_engraving(db_path: &str) -> (Arc<AppState>, Chunk) {
        let state = build_app(db_path);
        let conn = open_conn(db_path);
        insert_cart(&conn, "CART-01", 12);
        insert_batch(&conn, "B-PERSONAL", BatchType::Default, 30, true);
        for i in 0..3 {
            insert_order(
                &conn,
                &format!("P-{}", i),
                "B-PERSONAL",
                true,
                &[("MUG-CUSTOM", 1)],
            );
        }

        let chunk = state
            .picking_api
            .claim_chunk(&ClaimChunkRequest {
                cart_id: "CART-01".to_string(),
                picker_name: "测试拣选员".to_string(),
                cell_id: None,
                personalized: true,
            })
            .unwrap();
        let chunk = state.picking_api.complete_chunk(&chunk.chunk_id).unwrap();
        (state, chunk)
    }

    #[test]
    fn test_personalized_complete_keeps_cart_occupied() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let (_state, chunk) = setup_ready_for_engraving(&db_path);

        let conn = open_conn(&db_path);
        assert_eq!(chunk.status.to_db_str(), "READY_FOR_ENGRAVING");
        assert_eq!(chunk_status(&conn, &chunk.chunk_id), "READY_FOR_ENGRAVING");
        // 实物还在车上, 车不释放
        assert_eq!(cart_status(&conn, "CART-01"), "PICKING");
    }

    #[test]
    fn test_full_engraving_flow() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let (state, chunk) = setup_ready_for_engraving(&db_path);
        let conn = open_conn(&db_path);

        let started = state
            .picking_api
            .start_engraving(&chunk.chunk_id, "刻字员甲")
            .unwrap();
        assert_eq!(started.status.to_db_str(), "ENGRAVING");
        assert_eq!(started.engraver_name.as_deref(), Some("刻字员甲"));
        assert_eq!(cart_status(&conn, "CART-01"), "ENGRAVING");

        // 逐件写入可恢复进度检查点
        let updated = state
            .picking_api
            .mark_engraved_item(&EngravingCheckpointRequest {
                chunk_id: chunk.chunk_id.clone(),
                completed_indices: vec![0, 1],
                current_index: 2,
                total_paused_ms: 1200,
            })
            .unwrap();
        assert_eq!(updated.items_engraved, 2);

        // 整体标记已刻: 全部件完成但不做状态转换, 暂停时长保留
        let marked = state.picking_api.mark_engraved(&chunk.chunk_id).unwrap();
        assert_eq!(marked.items_engraved, 3);
        assert_eq!(marked.status.to_db_str(), "ENGRAVING");
        let progress = marked.engraving_progress.unwrap();
        assert_eq!(progress.total_paused_ms, 1200);
        assert_eq!(progress.completed_indices.len(), 3);

        let done = state.picking_api.complete_engraving(&chunk.chunk_id).unwrap();
        assert_eq!(done.status.to_db_str(), "READY_FOR_SHIPPING");
        assert!(done.engraving_completed_at.is_some());
        assert_eq!(cart_status(&conn, "CART-01"), "PICKED_READY");
    }

    #[test]
    fn test_checkpoint_out_of_range_is_rejected() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let (state, chunk) = setup_ready_for_engraving(&db_path);
        state
            .picking_api
            .start_engraving(&chunk.chunk_id, "刻字员甲")
            .unwrap();

        // 3 单的 chunk, 序号 3 越界
        let err = state
            .picking_api
            .mark_engraved_item(&EngravingCheckpointRequest {
                chunk_id: chunk.chunk_id.clone(),
                completed_indices: vec![0, 3],
                current_index: 1,
                total_paused_ms: 0,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        // 失败写入不得污染已存进度
        let conn = open_conn(&db_path);
        let items_engraved: i32 = conn
            .query_row(
                "SELECT items_engraved FROM chunk WHERE chunk_id = ?",
                rusqlite::params![&chunk.chunk_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(items_engraved, 0);
    }

    #[test]
    fn test_checkpoint_cannot_regress_completed_items() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let (state, chunk) = setup_ready_for_engraving(&db_path);
        state
            .picking_api
            .start_engraving(&chunk.chunk_id, "刻字员甲")
            .unwrap();
        state
            .picking_api
            .mark_engraved_item(&EngravingCheckpointRequest {
                chunk_id: chunk.chunk_id.clone(),
                completed_indices: vec![0, 1],
                current_index: 2,
                total_paused_ms: 0,
            })
            .unwrap();

        // 已刻 2 件, 空检查点等于把进度清零, 必须拒绝
        let err = state
            .picking_api
            .mark_engraved_item(&EngravingCheckpointRequest {
                chunk_id: chunk.chunk_id.clone(),
                completed_indices: vec![],
                current_index: 0,
                total_paused_ms: 0,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        // 丢掉已完成件的部分检查点同样拒绝
        let err = state
            .picking_api
            .mark_engraved_item(&EngravingCheckpointRequest {
                chunk_id: chunk.chunk_id.clone(),
                completed_indices: vec![1, 2],
                current_index: 2,
                total_paused_ms: 0,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        // 进度未被污染, 取消刻字照旧被挡
        let conn = open_conn(&db_path);
        let items_engraved: i32 = conn
            .query_row(
                "SELECT items_engraved FROM chunk WHERE chunk_id = ?",
                rusqlite::params![&chunk.chunk_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(items_engraved, 2);
        let err = state
            .picking_api
            .cancel_engraving(&chunk.chunk_id)
            .unwrap_err();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_cancel_engraving_only_before_first_item() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let (state, chunk) = setup_ready_for_engraving(&db_path);
        let conn = open_conn(&db_path);

        state
            .picking_api
            .start_engraving(&chunk.chunk_id, "刻字员甲")
            .unwrap();

        // 零件已刻: 允许取消, 回到待刻字, 车回到拣选占用
        let cancelled = state.picking_api.cancel_engraving(&chunk.chunk_id).unwrap();
        assert_eq!(cancelled.status.to_db_str(), "READY_FOR_ENGRAVING");
        assert!(cancelled.engraver_name.is_none());
        assert_eq!(cart_status(&conn, "CART-01"), "PICKING");

        // 刻了第一件之后不允许取消
        state
            .picking_api
            .start_engraving(&chunk.chunk_id, "刻字员乙")
            .unwrap();
        state
            .picking_api
            .mark_engraved_item(&EngravingCheckpointRequest {
                chunk_id: chunk.chunk_id.clone(),
                completed_indices: vec![0],
                current_index: 1,
                total_paused_ms: 0,
            })
            .unwrap();
        let err = state.picking_api.cancel_engraving(&chunk.chunk_id).unwrap_err();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_engraving_requires_correct_prior_state() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let (state, chunk) = setup_ready_for_engraving(&db_path);

        // 未开始刻字就写检查点
        let err = state
            .picking_api
            .mark_engraved_item(&EngravingCheckpointRequest {
                chunk_id: chunk.chunk_id.clone(),
                completed_indices: vec![0],
                current_index: 1,
                total_paused_ms: 0,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

        // 未开始刻字就完成刻字
        let err = state.picking_api.complete_engraving(&chunk.chunk_id).unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }
}
