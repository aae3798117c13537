// ==========================================
// 仓储拣选编排系统 - 面单预购服务
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 6. 外部接口 (Label prepurchase service)
// ==========================================
// 模型: 提交后事件 -> 内存队列 -> 后台 worker 发 HTTP
// 红线: 发后即忘, 任何失败只记日志, 绝不回传拣选事务
// ==========================================

use crate::engine::events::{PickingEvent, PickingEventPublisher, PickingEventType};
use serde::Deserialize;
use std::error::Error;
use tokio::sync::mpsc;

/// 面单预购响应 (下游返回的成功/失败计数)
#[derive(Debug, Deserialize)]
pub struct PrepurchaseResponse {
    #[serde(default)]
    pub succeeded: u32,
    #[serde(default)]
    pub failed: u32,
}

/// 事件入队适配器: 实现 Engine 层的 PickingEventPublisher
///
/// publish 只做入队, 不等待下游处理结果
pub struct LabelPrepurchaseQueue {
    sender: mpsc::UnboundedSender<PickingEvent>,
}

impl LabelPrepurchaseQueue {
    /// 创建队列, 返回 (发布端, 消费端)
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PickingEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl PickingEventPublisher for LabelPrepurchaseQueue {
    fn publish(&self, event: PickingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sender
            .send(event)
            .map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)
    }
}

/// 后台 worker: 消费事件队列, 对 ChunkPicked 触发面单预购
///
/// 在独立 tokio task 中运行直到发布端全部关闭
pub async fn run_label_worker(
    service_url: String,
    mut receiver: mpsc::UnboundedReceiver<PickingEvent>,
) {
    let client = reqwest::Client::new();
    tracing::info!("面单预购 worker 启动 - url={}", service_url);

    while let Some(event) = receiver.recv().await {
        if event.event_type != PickingEventType::ChunkPicked {
            continue;
        }
        prepurchase_labels(&client, &service_url, &event.chunk_id).await;
    }

    tracing::info!("面单预购 worker 退出");
}

/// 对单个 chunk 发起预购请求, 失败只记 warn
async fn prepurchase_labels(client: &reqwest::Client, service_url: &str, chunk_id: &str) {
    let result = client
        .post(service_url)
        .json(&serde_json::json!({ "chunkId": chunk_id }))
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            match response.json::<PrepurchaseResponse>().await {
                Ok(counts) => {
                    tracing::info!(
                        "面单预购完成 - chunk_id={}, succeeded={}, failed={}",
                        chunk_id,
                        counts.succeeded,
                        counts.failed
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "面单预购响应解析失败(已忽略) - chunk_id={}, error={}",
                        chunk_id,
                        e
                    );
                }
            }
        }
        Ok(response) => {
            tracing::warn!(
                "面单预购返回非成功状态(已忽略) - chunk_id={}, status={}",
                chunk_id,
                response.status()
            );
        }
        Err(e) => {
            tracing::warn!(
                "面单预购请求失败(已忽略) - chunk_id={}, error={}",
                chunk_id,
                e
            );
        }
    }
}
