// ==========================================
// 仓储拣选编排系统 - 应用层
// ==========================================
// 应用状态装配 + HTTP 路由
// ==========================================

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{get_default_db_path, AppState};
