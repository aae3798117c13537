// ==========================================
// 仓储拣选编排系统 - 数据仓储层
// ==========================================
// 职责: 数据访问,行映射
// 红线: Repository 不含业务逻辑;跨表事务由引擎层编排
// ==========================================

pub mod batch_repo;
pub mod bulk_batch_repo;
pub mod cart_repo;
pub mod cell_repo;
pub mod chunk_repo;
pub mod error;
pub mod order_repo;

// 重导出核心类型
pub use batch_repo::BatchRepository;
pub use bulk_batch_repo::BulkBatchRepository;
pub use cart_repo::CartRepository;
pub use cell_repo::CellRepository;
pub use chunk_repo::ChunkRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::OrderRepository;

use chrono::NaiveDateTime;

/// 统一时间戳格式(与数据库一致)
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 解析数据库时间戳列
pub(crate) fn parse_ts(idx: usize, s: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&s, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 格式化时间戳(入库用)
pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// 生成 SQL IN 子句的占位符串: "?,?,?"
pub(crate) fn sql_placeholders(count: usize) -> String {
    std::iter::repeat("?")
        .take(count)
        .collect::<Vec<_>>()
        .join(",")
}
