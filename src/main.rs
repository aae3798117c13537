// ==========================================
// 仓储拣选编排系统 - HTTP 服务主入口
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md
// 技术栈: Rust + SQLite + axum
// ==========================================

use std::sync::Arc;

use wms_picking::app::{create_router, get_default_db_path, AppState};
use wms_picking::services::{run_label_worker, LabelPrepurchaseQueue};

#[tokio::main]
async fn main() {
    // 初始化日志系统
    wms_picking::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 拣选控制平面", wms_picking::APP_NAME);
    tracing::info!("系统版本: {}", wms_picking::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 面单预购队列: 配置了 label_service_url 才启用
    let (publisher, receiver) = LabelPrepurchaseQueue::channel();

    // 创建AppState
    tracing::info!("正在初始化AppState...");
    let app_state = match AppState::new(db_path, Some(Arc::new(publisher))) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("AppState初始化成功");

    // 启动面单预购 worker
    match app_state.settings.label_service_url() {
        Some(url) => {
            tokio::spawn(run_label_worker(url, receiver));
        }
        None => {
            tracing::warn!("未配置 label_service_url, 面单预购事件将被丢弃");
            // 消费并丢弃, 避免队列无界增长
            tokio::spawn(async move {
                let mut receiver = receiver;
                while receiver.recv().await.is_some() {}
            });
        }
    }

    // 启动 HTTP 服务
    let port = app_state.settings.http_port();
    let addr = format!("0.0.0.0:{}", port);
    let app = create_router(app_state);

    tracing::info!("HTTP 服务监听: {}", addr);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("无法绑定端口 {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP 服务异常退出: {}", e);
        std::process::exit(1);
    }
}
