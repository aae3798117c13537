// ==========================================
// 仓储拣选编排系统 - 引擎层事件发布
// ==========================================
// 职责: 定义拣选事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，Services 层实现适配器
// 红线: 事件只能在事务提交之后发布，发布失败不回滚业务
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 拣选事件类型
// ==========================================

/// 拣选事件触发类型
///
/// Engine 层定义的事件类型，用于通知下游系统
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickingEventType {
    /// 波次领取完成
    ChunkClaimed,
    /// 波次拣货完成（触发面单预购）
    ChunkPicked,
    /// 波次取消
    ChunkCancelled,
    /// 雕刻完成
    EngravingCompleted,
}

impl PickingEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            PickingEventType::ChunkClaimed => "ChunkClaimed",
            PickingEventType::ChunkPicked => "ChunkPicked",
            PickingEventType::ChunkCancelled => "ChunkCancelled",
            PickingEventType::EngravingCompleted => "EngravingCompleted",
        }
    }
}

/// 拣选事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickingEvent {
    /// 波次 ID
    pub chunk_id: String,
    /// 事件类型
    pub event_type: PickingEventType,
    /// 事件来源描述
    pub source: Option<String>,
}

impl PickingEvent {
    pub fn new(chunk_id: String, event_type: PickingEventType, source: Option<String>) -> Self {
        Self {
            chunk_id,
            event_type,
            source,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 拣选事件发布者 Trait
///
/// Engine 层定义，Services 层实现
/// 通过 trait 实现依赖倒置，解除 Engine → Services 的直接依赖
///
/// # 实现说明
/// - Services 层的 `LabelPrepurchaseQueue` 实现此 trait
/// - 将 `PickingEvent` 投递到后台 worker，业务流程不等待结果
pub trait PickingEventPublisher: Send + Sync {
    /// 发布拣选事件
    ///
    /// # 返回
    /// - `Ok(())`: 已投递（不代表下游处理成功）
    /// - `Err`: 投递失败（调用方只记录日志，不回滚）
    fn publish(&self, event: PickingEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl PickingEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: PickingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - chunk_id={}, event_type={}",
            event.chunk_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn PickingEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn PickingEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn PickingEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    ///
    /// 失败只记录 warn，永不向调用方传播
    pub fn publish_after_commit(&self, event: PickingEvent) {
        match &self.inner {
            Some(publisher) => {
                if let Err(e) = publisher.publish(event.clone()) {
                    tracing::warn!(
                        "事件发布失败(已忽略) - chunk_id={}, event_type={}, error={}",
                        event.chunk_id,
                        event.event_type.as_str(),
                        e
                    );
                }
            }
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - chunk_id={}, event_type={}",
                    event.chunk_id,
                    event.event_type.as_str()
                );
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingPublisher {
        events: Mutex<Vec<PickingEvent>>,
    }

    impl PickingEventPublisher for RecordingPublisher {
        fn publish(&self, event: PickingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[test]
    fn test_optional_publisher_none_is_silent() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        publisher.publish_after_commit(PickingEvent::new(
            "CHUNK-1".to_string(),
            PickingEventType::ChunkPicked,
            None,
        ));
    }

    #[test]
    fn test_optional_publisher_delegates() {
        let recorder = Arc::new(RecordingPublisher {
            events: Mutex::new(Vec::new()),
        });
        let publisher = OptionalEventPublisher::with_publisher(recorder.clone());
        assert!(publisher.is_configured());

        publisher.publish_after_commit(PickingEvent::new(
            "CHUNK-9".to_string(),
            PickingEventType::ChunkPicked,
            Some("lifecycle".to_string()),
        ));

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].chunk_id, "CHUNK-9");
        assert_eq!(events[0].event_type, PickingEventType::ChunkPicked);
    }
}
