// ==========================================
// 仓储拣选编排系统 - 配置管理器
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 11. 配置项全集
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 说明: 对拣选引擎只读;阈值类配置带编译期默认值,
//       库内缺失或解析失败时回退默认并告警
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ===== 编译期默认值 =====

/// 同签名订单达到此数量才可成为 BULK 组
pub const DEFAULT_BULK_THRESHOLD: usize = 4;
/// 标准拣选车格数
pub const DEFAULT_MAX_BINS_STANDARD: usize = 12;
/// 大件拣选车格数
pub const DEFAULT_MAX_BINS_OVERSIZED: usize = 6;
/// SINGLES 模式单格订单上限
pub const DEFAULT_ORDERS_PER_BIN: usize = 24;
/// BULK 模式单 chunk 货架数上限
pub const DEFAULT_SHELVES_PER_CHUNK: usize = 3;
/// 批量子批容量上限
pub const DEFAULT_BULK_SPLIT_CAPACITY: usize = 24;
/// HTTP 监听端口
pub const DEFAULT_HTTP_PORT: u16 = 8090;

// ==========================================
// SettingsManager - 配置管理器
// ==========================================
pub struct SettingsManager {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsManager {
    /// 创建新的 SettingsManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, datetime('now'))
               ON CONFLICT(scope_id, key)
               DO UPDATE SET value = ?2, updated_at = datetime('now')"#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 列出 global scope 的全部配置
    pub fn list_global_config(&self) -> Result<HashMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global'")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (k, v) = row?;
            map.insert(k, v);
        }
        Ok(map)
    }

    /// 读取正整数配置,缺失或非法时回退默认值
    fn get_usize_or(&self, key: &str, default: usize) -> usize {
        match self.get_config_value(key) {
            Ok(Some(v)) => match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!("配置 {} 值非法: {:?},回退默认 {}", key, v, default);
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                tracing::warn!("读取配置 {} 失败: {},回退默认 {}", key, e, default);
                default
            }
        }
    }

    // ===== 拣选引擎阈值 =====

    /// BULK 成组所需的最少同签名订单数
    pub fn bulk_threshold(&self) -> usize {
        self.get_usize_or("bulk_threshold", DEFAULT_BULK_THRESHOLD)
    }

    /// 拣选车格数(标准/大件)
    pub fn max_bins(&self, oversized: bool) -> usize {
        if oversized {
            self.get_usize_or("max_bins_oversized", DEFAULT_MAX_BINS_OVERSIZED)
        } else {
            self.get_usize_or("max_bins_standard", DEFAULT_MAX_BINS_STANDARD)
        }
    }

    /// SINGLES 模式单格订单上限
    pub fn orders_per_bin(&self) -> usize {
        self.get_usize_or("orders_per_bin", DEFAULT_ORDERS_PER_BIN)
    }

    /// BULK 模式单 chunk 货架数上限
    pub fn shelves_per_chunk(&self) -> usize {
        self.get_usize_or("shelves_per_chunk", DEFAULT_SHELVES_PER_CHUNK)
    }

    /// 批量子批容量上限
    pub fn bulk_split_capacity(&self) -> usize {
        self.get_usize_or("bulk_split_capacity", DEFAULT_BULK_SPLIT_CAPACITY)
    }

    // ===== 外部协作方 =====

    /// 面单预购服务地址(空串表示未配置,事件将被丢弃并告警)
    pub fn label_service_url(&self) -> Option<String> {
        match self.get_config_value("label_service_url") {
            Ok(Some(v)) if !v.trim().is_empty() => Some(v),
            _ => None,
        }
    }

    /// HTTP 监听端口
    pub fn http_port(&self) -> u16 {
        match self.get_config_value("http_port") {
            Ok(Some(v)) => v.trim().parse().unwrap_or(DEFAULT_HTTP_PORT),
            _ => DEFAULT_HTTP_PORT,
        }
    }
}
