// ==========================================
// 仓储拣选编排系统 - Chunk 领域模型
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Chunk
// 红线: chunk_number 按批次单调递增,由领取事务内 read-max 派生
// ==========================================

use crate::domain::types::{ChunkStatus, PickingMode};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// Chunk - 拣选工作单元
// ==========================================
// 一辆车 + 一名拣选员 + 一组订单的原子工作包
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,               // Chunk ID
    pub batch_id: String,               // 所属批次
    pub chunk_number: i32,              // 批次内序号(单调递增)
    pub picking_mode: PickingMode,      // 拣选模式
    pub status: ChunkStatus,            // 状态
    pub cart_id: String,                // 占用的拣选车
    pub picker_name: String,            // 拣选员
    pub orders_in_chunk: i32,           // 当前在册订单数
    pub orders_skipped: i32,            // 缺货释放订单数
    pub claimed_at: NaiveDateTime,      // 领取时间
    pub pick_started_at: Option<NaiveDateTime>,   // 开拣时间
    pub pick_completed_at: Option<NaiveDateTime>, // 拣毕时间
    pub cancel_reason: Option<String>,  // 取消原因

    // ===== 刻字子流程(仅个性化 chunk) =====
    pub engraver_name: Option<String>,  // 刻字员
    pub engraving_started_at: Option<NaiveDateTime>,   // 刻字开始时间
    pub engraving_completed_at: Option<NaiveDateTime>, // 刻字完成时间
    pub engraving_progress: Option<EngravingProgress>, // 可恢复进度
    pub items_engraved: i32,            // 已刻件数
}

impl Chunk {
    /// 判断是否可取消(仅 PICKING / PICKED)
    pub fn is_cancellable(&self) -> bool {
        matches!(self.status, ChunkStatus::Picking | ChunkStatus::Picked)
    }
}

// ==========================================
// EngravingProgress - 刻字进度检查点
// ==========================================
// 显式带标签结构,替代源系统的松散 JSON blob;
// 每次写入都经 validate 校验(依据 Picking_Engine_Specs 9. 设计说明)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngravingProgress {
    pub completed_indices: BTreeSet<usize>, // 已完成的件序号(0 起)
    pub current_index: usize,               // 当前处理件序号
    pub total_paused_ms: i64,               // 累计暂停毫秒数
}

impl EngravingProgress {
    /// 校验进度记录的内部一致性
    ///
    /// # 规则
    /// - 所有序号必须小于 total_items
    /// - current_index 不得超过 total_items(允许等于,表示走到末尾)
    /// - 暂停时长不得为负
    pub fn validate(&self, total_items: usize) -> Result<(), String> {
        if let Some(max) = self.completed_indices.iter().max() {
            if *max >= total_items {
                return Err(format!(
                    "已完成序号 {} 超出件数上限 {}",
                    max, total_items
                ));
            }
        }
        if self.current_index > total_items {
            return Err(format!(
                "当前序号 {} 超出件数上限 {}",
                self.current_index, total_items
            ));
        }
        if self.total_paused_ms < 0 {
            return Err("暂停时长不能为负".to_string());
        }
        Ok(())
    }

    /// 序列化为 JSON 字符串(入库用)
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ==========================================
// ChunkBulkBatchAssignment - chunk 与批量货架的绑定
// ==========================================
// BULK 模式每领取一个子批记一行,shelf_number 为车上货架层号(1 起)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkBulkBatchAssignment {
    pub chunk_id: String,      // Chunk ID
    pub bulk_batch_id: String, // 批量子批ID
    pub shelf_number: i32,     // 货架层号
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engraving_progress_validate() {
        let mut p = EngravingProgress::default();
        p.completed_indices.insert(0);
        p.completed_indices.insert(3);
        p.current_index = 4;

        assert!(p.validate(5).is_ok());
        // 序号 3 在 3 件的 chunk 中越界
        assert!(p.validate(3).is_err());
    }

    #[test]
    fn test_engraving_progress_roundtrip() {
        let mut p = EngravingProgress::default();
        p.completed_indices.insert(1);
        p.current_index = 2;
        p.total_paused_ms = 1500;

        let json = p.to_json().unwrap();
        let parsed = EngravingProgress::from_json(&json).unwrap();
        assert_eq!(p, parsed);
    }
}
