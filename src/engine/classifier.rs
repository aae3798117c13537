// ==========================================
// 仓储拣选编排系统 - 订单分类引擎
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 4.2 Order Classifier
// ==========================================
// 职责: 对待拣选订单池打分类标签
// 红线: 分类幂等,与处理顺序无关(按签名分组,不按到达序)
// 红线: SINGLE 是终态分类,不因重复数升级为 BULK
// ==========================================

use crate::domain::order::{Order, OrderItem};
use crate::domain::types::OrderCategory;
use crate::engine::signature::{compute_signature, OrderSignature};
use std::collections::HashMap;

/// BULK 组单均件数下限(含)
///
/// 物理约束: 批量货架一行 4 格,单均件数必须能铺进一行
pub const BULK_ITEM_COUNT_MIN: i32 = 2;
/// BULK 组单均件数上限(含)
pub const BULK_ITEM_COUNT_MAX: i32 = 4;

// ==========================================
// ClassifiedOrder - 分类结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ClassifiedOrder {
    pub order_id: String,
    pub category: OrderCategory,
    /// 订单签名(BULK 重建分组时复用,避免重复计算)
    pub signature: OrderSignature,
}

// ==========================================
// OrderClassifier - 订单分类引擎
// ==========================================
pub struct OrderClassifier {
    // 无状态引擎,不需要注入依赖
}

impl Default for OrderClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderClassifier {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 对订单池分类
    ///
    /// # 分类优先级(依据 Picking_Engine_Specs 4.2)
    /// 1. personalized 标记 -> PERSONALIZED(终态,覆盖一切)
    /// 2. 实物件数恰为 1 -> SINGLE(终态,不参与 BULK 判定)
    /// 3. 按签名分组;组内单均件数在 [2,4] 且成员数 >= bulk_threshold -> BULK
    /// 4. 其余 -> ORDER_BY_SIZE
    ///
    /// # 参数
    /// - `orders`: 订单与其订单行(任意顺序)
    /// - `bulk_threshold`: BULK 成组所需的最少同签名订单数
    pub fn classify(
        &self,
        orders: &[(Order, Vec<OrderItem>)],
        bulk_threshold: usize,
    ) -> Vec<ClassifiedOrder> {
        // 第一遍: 终态分类 + 签名计算
        let mut pending_by_signature: HashMap<String, Vec<usize>> = HashMap::new();
        let mut results: Vec<ClassifiedOrder> = Vec::with_capacity(orders.len());

        for (idx, (order, items)) in orders.iter().enumerate() {
            let signature = compute_signature(items);

            let category = if order.personalized {
                Some(OrderCategory::Personalized)
            } else if signature.item_count == 1 {
                Some(OrderCategory::Single)
            } else {
                None
            };

            if category.is_none() {
                pending_by_signature
                    .entry(signature.signature.clone())
                    .or_default()
                    .push(idx);
            }

            results.push(ClassifiedOrder {
                order_id: order.order_id.clone(),
                // 未定者先占位为默认分类,第二遍覆盖
                category: category.unwrap_or(OrderCategory::OrderBySize),
                signature,
            });
        }

        // 第二遍: 签名分组判定 BULK
        for indices in pending_by_signature.values() {
            let item_count = results[indices[0]].signature.item_count;
            let eligible_size = (BULK_ITEM_COUNT_MIN..=BULK_ITEM_COUNT_MAX).contains(&item_count);

            if eligible_size && indices.len() >= bulk_threshold {
                for &idx in indices {
                    results[idx].category = OrderCategory::Bulk;
                }
            }
        }

        results
    }
}
