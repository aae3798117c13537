// ==========================================
// 仓储拣选编排系统 - 订单签名引擎
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 4.1 Signature Engine
// ==========================================
// 职责: 计算订单组成的规范指纹,用于重复订单识别
// 红线: 纯函数,无副作用;同一件数多重集无论输入顺序,
//       签名与 item_count 必须一致
// ==========================================

use crate::domain::order::OrderItem;
use std::collections::BTreeMap;

// ==========================================
// OrderSignature - 订单签名(派生值,不落库)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSignature {
    /// 规范签名串: "SKU:QTY|SKU:QTY|..."(SKU 升序)
    pub signature: String,
    /// 实物总件数(数量求和)
    pub item_count: i32,
    /// 归一化后的 (SKU, 数量) 列表,SKU 升序
    pub normalized_items: Vec<(String, i32)>,
}

impl OrderSignature {
    /// 取件数最多的 SKU(SINGLES 模式按此聚合落格)
    ///
    /// 并列时取 SKU 字典序最小者,保证确定性
    pub fn dominant_sku(&self) -> Option<&str> {
        self.normalized_items
            .iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(sku, _)| sku.as_str())
    }
}

/// 计算订单签名
///
/// # 算法
/// 1. 过滤非实物行(运费险/运费附加项)
/// 2. SKU 大写、去首尾空白
/// 3. 同 SKU 数量合并
/// 4. 按 SKU 升序序列化为 "SKU:QTY|SKU:QTY"
///
/// # 参数
/// - `items`: 订单行列表(任意顺序)
pub fn compute_signature(items: &[OrderItem]) -> OrderSignature {
    // BTreeMap 同时完成去重合并与升序
    let mut merged: BTreeMap<String, i32> = BTreeMap::new();

    for item in items {
        if !item.is_physical() {
            continue;
        }
        let sku = item.sku.trim().to_uppercase();
        if sku.is_empty() || item.quantity <= 0 {
            continue;
        }
        *merged.entry(sku).or_insert(0) += item.quantity;
    }

    let normalized_items: Vec<(String, i32)> = merged.into_iter().collect();
    let item_count: i32 = normalized_items.iter().map(|(_, q)| q).sum();
    let signature = normalized_items
        .iter()
        .map(|(sku, qty)| format!("{}:{}", sku, qty))
        .collect::<Vec<_>>()
        .join("|");

    OrderSignature {
        signature,
        item_count,
        normalized_items,
    }
}
