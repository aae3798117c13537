// ==========================================
// 仓储拣选编排系统 - 配置 API
// ==========================================
// 职责: config_kv 的读写面 (阈值与容量参数对运维可调)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::SettingsManager;
use std::collections::HashMap;
use std::sync::Arc;

pub struct SettingsApi {
    settings: Arc<SettingsManager>,
}

impl SettingsApi {
    pub fn new(settings: Arc<SettingsManager>) -> Self {
        Self { settings }
    }

    /// 全量配置
    pub fn list(&self) -> ApiResult<HashMap<String, String>> {
        self.settings
            .list_global_config()
            .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))
    }

    /// 单项读取
    pub fn get(&self, key: &str) -> ApiResult<Option<String>> {
        self.settings
            .get_global_config_value(key)
            .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))
    }

    /// 单项写入 (数值型配置先做可解析校验)
    pub fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        if key.trim().is_empty() {
            return Err(ApiError::InvalidInput("配置 key 不能为空".to_string()));
        }

        let numeric_keys = [
            "bulk_threshold",
            "max_bins_standard",
            "max_bins_oversized",
            "orders_per_bin",
            "shelves_per_chunk",
            "bulk_split_capacity",
            "http_port",
        ];
        if numeric_keys.contains(&key) && value.parse::<u64>().is_err() {
            return Err(ApiError::InvalidInput(format!(
                "配置 {} 必须是非负整数: {}",
                key, value
            )));
        }

        self.settings
            .set_global_config_value(key, value)
            .map_err(|e| ApiError::InternalError(format!("配置写入失败: {}", e)))?;

        tracing::info!("配置更新 - key={}, value={}", key, value);
        Ok(())
    }
}
