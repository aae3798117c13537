// ==========================================
// 仓储拣选编排系统 - 格位分配引擎
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 4.5 Bin Assigner
// ==========================================
// 职责: 在领取事务内, 按库位对拣选对象排序并写入连续格位号
// 红线: 1. 格位号从 1 开始连续无空洞
//       2. 所有格位写入必须发生在调用方的同一事务内
//       3. 库位解析失败不报错, 回退到末尾排序哨兵
// ==========================================

use crate::domain::batch::BulkBatch;
use crate::domain::types::BulkBatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

/// 未解析库位的排序哨兵 (排在所有真实库位之后)
pub const UNRESOLVED_LOCATION_SORT_KEY: &str = "ZZZ";

// ==========================================
// 库位解析 Trait
// ==========================================

/// 库位解析器 Trait
///
/// Engine 层定义，Services 层实现
/// 实现方必须使用独立连接查询，避免与领取事务互相持锁
pub trait BinLocationResolver: Send + Sync {
    /// 批量解析 SKU 库位，未命中的 SKU 不出现在结果中
    fn resolve_many(&self, skus: &[String]) -> RepositoryResult<HashMap<String, String>>;
}

/// SINGLES 模式的 SKU 分组: 同 SKU 的订单共享一个格位
#[derive(Debug, Clone)]
pub struct SkuGroup {
    pub sku: String,
    pub order_ids: Vec<String>,
}

// ==========================================
// BinAssigner - 格位分配引擎
// ==========================================
pub struct BinAssigner {
    location_resolver: Arc<dyn BinLocationResolver>,
}

impl BinAssigner {
    pub fn new(location_resolver: Arc<dyn BinLocationResolver>) -> Self {
        Self { location_resolver }
    }

    /// 解析库位并回退到哨兵
    fn sort_key(locations: &HashMap<String, String>, sku: &str) -> String {
        locations
            .get(sku)
            .cloned()
            .unwrap_or_else(|| UNRESOLVED_LOCATION_SORT_KEY.to_string())
    }

    /// SINGLES 模式: SKU 组按库位升序, 每组一个格位, 组内订单共享格位号
    ///
    /// # 返回
    /// 实际占用的格位数 (= SKU 组数)
    pub fn assign_singles(
        &self,
        tx: &Transaction,
        groups: &[SkuGroup],
    ) -> RepositoryResult<usize> {
        let skus: Vec<String> = groups.iter().map(|g| g.sku.clone()).collect();
        let locations = self.location_resolver.resolve_many(&skus)?;

        let mut sorted: Vec<&SkuGroup> = groups.iter().collect();
        sorted.sort_by(|a, b| {
            Self::sort_key(&locations, &a.sku)
                .cmp(&Self::sort_key(&locations, &b.sku))
                .then_with(|| a.sku.cmp(&b.sku))
        });

        for (i, group) in sorted.iter().enumerate() {
            let bin_number = (i + 1) as i32;
            for order_id in &group.order_ids {
                Self::write_bin_number(tx, order_id, bin_number)?;
            }
        }

        Ok(sorted.len())
    }

    /// BULK 模式: 按 split_index 顺序处理货架, 格位号跨货架全局递增
    ///
    /// 每个货架额外写入 chunk_bulk_batch 关联记录,
    /// 并把对应 bulk_batch 翻转为 ASSIGNED
    ///
    /// # 参数
    /// - `shelves`: (子批, 订单ID列表), 已按 split_index 升序
    ///
    /// # 返回
    /// 实际占用的格位数 (= 订单总数)
    pub fn assign_bulk(
        &self,
        tx: &Transaction,
        chunk_id: &str,
        shelves: &[(BulkBatch, Vec<String>)],
    ) -> RepositoryResult<usize> {
        let mut bin_counter = 0;

        for (shelf_idx, (bulk_batch, order_ids)) in shelves.iter().enumerate() {
            let shelf_number = (shelf_idx + 1) as i32;

            tx.execute(
                "INSERT INTO chunk_bulk_batch (chunk_id, bulk_batch_id, shelf_number) VALUES (?, ?, ?)",
                params![chunk_id, &bulk_batch.bulk_batch_id, shelf_number],
            )?;

            let updated = tx.execute(
                "UPDATE bulk_batch SET status = ? WHERE bulk_batch_id = ? AND status = ?",
                params![
                    BulkBatchStatus::Assigned.to_db_str(),
                    &bulk_batch.bulk_batch_id,
                    BulkBatchStatus::Pending.to_db_str(),
                ],
            )?;
            if updated == 0 {
                return Err(RepositoryError::StateConflict {
                    message: format!("批量子批已被占用: {}", bulk_batch.bulk_batch_id),
                });
            }

            for order_id in order_ids {
                bin_counter += 1;
                Self::write_bin_number(tx, order_id, bin_counter)?;
            }
        }

        Ok(bin_counter as usize)
    }

    /// 默认模式 (ORDER_BY_SIZE / 个性化): 订单按首个实物 SKU 的库位升序, 一单一格
    ///
    /// # 参数
    /// - `orders`: (订单ID, 首个实物SKU) 列表
    ///
    /// # 返回
    /// 实际占用的格位数 (= 订单数)
    pub fn assign_by_location(
        &self,
        tx: &Transaction,
        orders: &[(String, String)],
    ) -> RepositoryResult<usize> {
        let skus: Vec<String> = orders.iter().map(|(_, sku)| sku.clone()).collect();
        let locations = self.location_resolver.resolve_many(&skus)?;

        let mut sorted: Vec<&(String, String)> = orders.iter().collect();
        sorted.sort_by(|a, b| {
            Self::sort_key(&locations, &a.1)
                .cmp(&Self::sort_key(&locations, &b.1))
                .then_with(|| a.0.cmp(&b.0))
        });

        for (i, (order_id, _)) in sorted.iter().enumerate() {
            Self::write_bin_number(tx, order_id, (i + 1) as i32)?;
        }

        Ok(sorted.len())
    }

    /// 写入单个订单的格位号
    ///
    /// 订单必须已在本事务内被赋予 chunk_id
    fn write_bin_number(tx: &Transaction, order_id: &str, bin_number: i32) -> RepositoryResult<()> {
        let updated = tx.execute(
            "UPDATE orders SET bin_number = ?, updated_at = datetime('now', 'localtime') WHERE order_id = ?",
            params![bin_number, order_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapResolver {
        map: HashMap<String, String>,
    }

    impl BinLocationResolver for MapResolver {
        fn resolve_many(&self, skus: &[String]) -> RepositoryResult<HashMap<String, String>> {
            Ok(skus
                .iter()
                .filter_map(|s| self.map.get(s).map(|l| (s.clone(), l.clone())))
                .collect())
        }
    }

    #[test]
    fn test_sort_key_falls_back_to_sentinel() {
        let mut map = HashMap::new();
        map.insert("A".to_string(), "A-01-02".to_string());

        assert_eq!(BinAssigner::sort_key(&map, "A"), "A-01-02");
        assert_eq!(
            BinAssigner::sort_key(&map, "UNKNOWN"),
            UNRESOLVED_LOCATION_SORT_KEY
        );
    }
}
