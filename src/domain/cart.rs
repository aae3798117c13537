// ==========================================
// 仓储拣选编排系统 - 拣选车领域模型
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 3. 数据模型 / Cart
// ==========================================

use crate::domain::types::CartStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// Cart - 拣选车
// ==========================================
// 物理格数固定;AVAILABLE 是领取事务的前置条件,
// 状态检查与翻转必须在同一事务内完成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub cart_id: String,    // 拣选车ID
    pub cart_name: String,  // 车名(面向人的编号)
    pub bin_capacity: i32,  // 物理格数
    pub is_active: bool,    // 是否启用
    pub status: CartStatus, // 状态
}

impl Cart {
    /// 判断是否可被领取
    pub fn is_claimable(&self) -> bool {
        self.is_active && self.status == CartStatus::Available
    }
}
