// ==========================================
// 仓储拣选编排系统 - 批量切分引擎
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 4.3 Bulk Splitter
// ==========================================
// 职责: 把同签名订单群切成容量受限的子批,
//       并推导每个子批的货架格位布局
// 红线: 纯函数,切分必须均衡(余数摊给前面的组)
// ==========================================

use crate::domain::batch::{BulkBatch, SkuLayoutEntry};
use crate::domain::types::BulkBatchStatus;
use chrono::NaiveDateTime;
use uuid::Uuid;

// ==========================================
// BulkSplitter - 批量切分引擎
// ==========================================
pub struct BulkSplitter {
    // 无状态引擎,不需要注入依赖
}

impl Default for BulkSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkSplitter {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算均衡切分的组大小
    ///
    /// # 算法
    /// ceil(total / max_per_bin) 组,余数从第一组起逐个 +1
    ///
    /// # 示例
    /// - split_counts(50, 24) = [17, 17, 16]
    /// - split_counts(72, 24) = [24, 24, 24]
    /// - split_counts(20, 24) = [20]
    pub fn split_counts(&self, total: usize, max_per_bin: usize) -> Vec<usize> {
        if total == 0 || max_per_bin == 0 {
            return Vec::new();
        }

        let groups = total.div_ceil(max_per_bin);
        let base = total / groups;
        let remainder = total % groups;

        (0..groups)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect()
    }

    /// 推导子批的货架格位布局
    ///
    /// 每个数量单位展开为独立一格;子批内订单同构,
    /// 因此所有格位的 bin_qty 都等于子批订单数
    ///
    /// # 参数
    /// - `normalized_items`: 签名引擎输出的 (SKU, 数量) 列表(SKU 升序)
    /// - `orders_in_split`: 子批订单数
    pub fn build_sku_layout(
        &self,
        normalized_items: &[(String, i32)],
        orders_in_split: usize,
    ) -> Vec<SkuLayoutEntry> {
        let mut layout = Vec::new();
        let mut bin_index = 1;

        for (sku, qty) in normalized_items {
            for _ in 0..*qty {
                layout.push(SkuLayoutEntry {
                    sku: sku.clone(),
                    bin_qty: orders_in_split as i32,
                    bin_index,
                });
                bin_index += 1;
            }
        }

        layout
    }

    /// 为一个签名组装配子批记录
    ///
    /// # 参数
    /// - `batch_id`: 所属批次
    /// - `signature`: 组签名
    /// - `normalized_items`: 签名的归一化组成
    /// - `total_orders`: 组内订单总数
    /// - `max_per_split`: 子批容量上限
    /// - `now`: 创建时间
    pub fn build_bulk_batches(
        &self,
        batch_id: &str,
        signature: &str,
        normalized_items: &[(String, i32)],
        total_orders: usize,
        max_per_split: usize,
        now: NaiveDateTime,
    ) -> Vec<BulkBatch> {
        self.split_counts(total_orders, max_per_split)
            .into_iter()
            .enumerate()
            .map(|(split_index, order_count)| BulkBatch {
                bulk_batch_id: Uuid::new_v4().to_string(),
                batch_id: batch_id.to_string(),
                signature: signature.to_string(),
                split_index: split_index as i32,
                order_count: order_count as i32,
                sku_layout: self.build_sku_layout(normalized_items, order_count),
                status: BulkBatchStatus::Pending,
                created_at: now,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_counts_balanced() {
        let splitter = BulkSplitter::new();

        assert_eq!(splitter.split_counts(50, 24), vec![17, 17, 16]);
        assert_eq!(splitter.split_counts(72, 24), vec![24, 24, 24]);
        assert_eq!(splitter.split_counts(20, 24), vec![20]);
        assert_eq!(splitter.split_counts(25, 24), vec![13, 12]);
    }

    #[test]
    fn test_split_counts_edge_cases() {
        let splitter = BulkSplitter::new();

        assert!(splitter.split_counts(0, 24).is_empty());
        assert!(splitter.split_counts(10, 0).is_empty());
        assert_eq!(splitter.split_counts(1, 24), vec![1]);
        assert_eq!(splitter.split_counts(24, 24), vec![24]);
    }

    #[test]
    fn test_split_counts_sum_preserved() {
        let splitter = BulkSplitter::new();

        for total in 1..200 {
            let counts = splitter.split_counts(total, 24);
            assert_eq!(counts.iter().sum::<usize>(), total);
            assert!(counts.iter().all(|&c| c <= 24));
            // 均衡: 最大最小组差不超过 1
            let max = counts.iter().max().unwrap();
            let min = counts.iter().min().unwrap();
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn test_sku_layout_expands_quantity() {
        let splitter = BulkSplitter::new();
        let items = vec![
            ("GREEN".to_string(), 2),
            ("RED".to_string(), 1),
            ("WHITE".to_string(), 1),
        ];

        let layout = splitter.build_sku_layout(&items, 17);

        // 1 红 + 1 白 + 2 绿 -> 4 格
        assert_eq!(layout.len(), 4);
        let skus: Vec<&str> = layout.iter().map(|e| e.sku.as_str()).collect();
        assert_eq!(skus, vec!["GREEN", "GREEN", "RED", "WHITE"]);
        assert!(layout.iter().all(|e| e.bin_qty == 17));
        let indices: Vec<i32> = layout.iter().map(|e| e.bin_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_build_bulk_batches() {
        let splitter = BulkSplitter::new();
        let items = vec![("A".to_string(), 1), ("B".to_string(), 1)];
        let now = chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        let batches = splitter.build_bulk_batches("BATCH-1", "A:1|B:1", &items, 50, 24, now);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].split_index, 0);
        assert_eq!(batches[0].order_count, 17);
        assert_eq!(batches[2].order_count, 16);
        // 每个子批的布局格数 = 签名件数,bin_qty = 子批订单数
        assert_eq!(batches[1].sku_layout.len(), 2);
        assert_eq!(batches[1].sku_layout[0].bin_qty, 17);
        assert_eq!(batches[2].sku_layout[0].bin_qty, 16);
    }
}
