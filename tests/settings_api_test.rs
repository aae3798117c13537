// ==========================================
// 配置读写接口测试
// ==========================================
// 覆盖: 全量读取、单项读取、单项写入与数值校验
// ==========================================


#[cfg(test)]
mod settings_api_test {
    use crate::test_helpers::*;
    use wms_picking::api::ApiError;

    #[test]
    fn test_list_contains_seeded_defaults() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        let settings = state.settings_api.list().unwrap();
        assert_eq!(settings.get("bulk_threshold").map(String::as_str), Some("4"));
        assert_eq!(
            settings.get("max_bins_standard").map(String::as_str),
            Some("12")
        );
        assert_eq!(
            settings.get("shelves_per_chunk").map(String::as_str),
            Some("3")
        );
    }

    #[test]
    fn test_get_reads_single_key_or_none() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        let value = state.settings_api.get("orders_per_bin").unwrap();
        assert_eq!(value.as_deref(), Some("24"));

        // 未知 key 读不到, 不报错
        let missing = state.settings_api.get("no_such_key").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        state.settings_api.set("bulk_threshold", "6").unwrap();
        let value = state.settings_api.get("bulk_threshold").unwrap();
        assert_eq!(value.as_deref(), Some("6"));
    }

    #[test]
    fn test_set_rejects_non_numeric_for_numeric_keys() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = build_app(&db_path);

        let err = state
            .settings_api
            .set("orders_per_bin", "many")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        // 失败写入不影响原值
        let value = state.settings_api.get("orders_per_bin").unwrap();
        assert_eq!(value.as_deref(), Some("24"));
    }
}
