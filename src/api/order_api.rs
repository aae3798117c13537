// ==========================================
// 仓储拣选编排系统 - 订单接入/分类 API
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 4.2 Order Classifier
// 依据: Picking_Engine_Specs_v0.2.md - 9. 设计说明 (入库归一化)
// ==========================================
// 红线: 原始载荷的"对象或数组"二义性在入库时消解,
//       归一化后的形态是引擎层唯一认识的形态
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::SettingsManager;
use crate::domain::order::{Order, OrderItem};
use crate::domain::types::{BatchType, ItemType, OrderCategory, OrderStatus};
use crate::engine::bulk_splitter::BulkSplitter;
use crate::engine::classifier::{ClassifiedOrder, OrderClassifier};
use crate::repository::batch_repo::BatchRepository;
use crate::repository::bulk_batch_repo::BulkBatchRepository;
use crate::repository::order_repo::OrderRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// 原始订单载荷 (入库前形态)
// ==========================================

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct RawItemDoc {
    sku: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_quantity")]
    quantity: i32,
    #[serde(default, rename = "type")]
    item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrderDoc {
    #[serde(default)]
    order_id: Option<String>,
    order_number: String,
    #[serde(default)]
    personalized: bool,
    items: Vec<RawItemDoc>,
}

/// 入库结果摘要
#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub ingested: usize,
    pub order_ids: Vec<String>,
}

/// 重分类结果摘要
#[derive(Debug, Default, Serialize)]
pub struct ReclassifySummary {
    pub total: usize,
    pub personalized: usize,
    pub single: usize,
    pub bulk: usize,
    pub order_by_size: usize,
    pub bulk_batches_rebuilt: usize,
}

// ==========================================
// OrderApi
// ==========================================
pub struct OrderApi {
    order_repo: Arc<OrderRepository>,
    batch_repo: Arc<BatchRepository>,
    bulk_batch_repo: Arc<BulkBatchRepository>,
    settings: Arc<SettingsManager>,
    classifier: OrderClassifier,
    splitter: BulkSplitter,
}

impl OrderApi {
    pub fn new(
        order_repo: Arc<OrderRepository>,
        batch_repo: Arc<BatchRepository>,
        bulk_batch_repo: Arc<BulkBatchRepository>,
        settings: Arc<SettingsManager>,
    ) -> Self {
        Self {
            order_repo,
            batch_repo,
            bulk_batch_repo,
            settings,
            classifier: OrderClassifier::new(),
            splitter: BulkSplitter::new(),
        }
    }

    // ==========================================
    // 订单接入
    // ==========================================

    /// 接入原始订单载荷 (单个对象或对象数组均可)
    ///
    /// 归一化规则: 生成缺失的 order_id、行类型标准化为
    /// PHYSICAL / INSURANCE / SHIPPING、SKU 原样保留 (签名引擎再统一大小写)
    pub fn ingest(&self, payload: serde_json::Value) -> ApiResult<IngestSummary> {
        let docs: Vec<RawOrderDoc> = match payload {
            serde_json::Value::Array(values) => values
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()
                .map_err(|e| ApiError::InvalidInput(format!("订单载荷解析失败: {}", e)))?,
            value @ serde_json::Value::Object(_) => vec![serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidInput(format!("订单载荷解析失败: {}", e)))?],
            _ => {
                return Err(ApiError::InvalidInput(
                    "订单载荷必须是对象或对象数组".to_string(),
                ))
            }
        };

        let mut order_ids = Vec::with_capacity(docs.len());
        for doc in docs {
            let (order, items) = Self::normalize(doc)?;
            self.order_repo.insert_with_items(&order, &items)?;
            order_ids.push(order.order_id);
        }

        tracing::info!("订单接入完成 - count={}", order_ids.len());
        Ok(IngestSummary {
            ingested: order_ids.len(),
            order_ids,
        })
    }

    fn normalize(doc: RawOrderDoc) -> ApiResult<(Order, Vec<OrderItem>)> {
        if doc.order_number.trim().is_empty() {
            return Err(ApiError::InvalidInput("order_number 不能为空".to_string()));
        }
        if doc.items.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "订单 {} 没有订单行",
                doc.order_number
            )));
        }

        let order_id = doc
            .order_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let now = chrono::Local::now().naive_local();
        let order = Order {
            order_id: order_id.clone(),
            order_number: doc.order_number,
            status: OrderStatus::AwaitingShipment,
            personalized: doc.personalized,
            category: None,
            batch_id: None,
            bulk_batch_id: None,
            chunk_id: None,
            bin_number: None,
            created_at: now,
            updated_at: now,
        };

        let items = doc
            .items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                if item.quantity <= 0 {
                    return Err(ApiError::InvalidInput(format!(
                        "订单行数量必须为正: sku={}, quantity={}",
                        item.sku, item.quantity
                    )));
                }
                Ok(OrderItem {
                    order_id: order_id.clone(),
                    line_no: (i + 1) as i32,
                    sku: item.sku,
                    item_name: item.name,
                    quantity: item.quantity,
                    item_type: Self::normalize_item_type(item.item_type.as_deref()),
                })
            })
            .collect::<ApiResult<Vec<OrderItem>>>()?;

        Ok((order, items))
    }

    fn normalize_item_type(raw: Option<&str>) -> ItemType {
        let Some(raw) = raw else {
            return ItemType::Physical;
        };
        let upper = raw.trim().to_uppercase();
        if upper.contains("INSURANCE") {
            ItemType::Insurance
        } else if upper.contains("SHIPPING") {
            ItemType::Shipping
        } else {
            ItemType::Physical
        }
    }

    // ==========================================
    // 池重分类
    // ==========================================

    /// 对可领取订单池重跑分类
    ///
    /// 分类结果回写 orders.category; BULK 批次的 PENDING 子批整体重建
    /// (已绑 chunk 的子批不动)。新订单进池后应调用本方法
    pub fn reclassify(&self) -> ApiResult<ReclassifySummary> {
        let pool = self.order_repo.list_claimable_pool()?;
        if pool.is_empty() {
            return Ok(ReclassifySummary::default());
        }

        let ids: Vec<String> = pool.iter().map(|o| o.order_id.clone()).collect();
        let items = self.order_repo.find_items_for_orders(&ids)?;
        let pairs: Vec<(Order, Vec<OrderItem>)> = pool
            .into_iter()
            .map(|order| {
                let order_items = items.get(&order.order_id).cloned().unwrap_or_default();
                (order, order_items)
            })
            .collect();

        let bulk_threshold = self.settings.bulk_threshold();
        let classified = self.classifier.classify(&pairs, bulk_threshold);

        let mut summary = ReclassifySummary {
            total: classified.len(),
            ..Default::default()
        };
        for result in &classified {
            self.order_repo
                .update_category(&result.order_id, result.category)?;
            match result.category {
                OrderCategory::Personalized => summary.personalized += 1,
                OrderCategory::Single => summary.single += 1,
                OrderCategory::Bulk => summary.bulk += 1,
                OrderCategory::OrderBySize => summary.order_by_size += 1,
            }
        }

        summary.bulk_batches_rebuilt = self.rebuild_bulk_batches(&pairs, &classified)?;

        tracing::info!(
            "池重分类完成 - total={}, bulk={}, single={}, personalized={}, rebuilt={}",
            summary.total,
            summary.bulk,
            summary.single,
            summary.personalized,
            summary.bulk_batches_rebuilt
        );
        Ok(summary)
    }

    /// 重建 BULK 批次的 PENDING 子批
    ///
    /// 按 (batch_id, signature) 分组, 仅处理类型为 BULK 的批次;
    /// 组内订单按切分大小顺次绑定到各子批
    fn rebuild_bulk_batches(
        &self,
        pairs: &[(Order, Vec<OrderItem>)],
        classified: &[ClassifiedOrder],
    ) -> ApiResult<usize> {
        let order_index: HashMap<&str, &Order> = pairs
            .iter()
            .map(|(order, _)| (order.order_id.as_str(), order))
            .collect();

        // (batch_id, signature) -> 分类结果下标
        let mut groups: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (idx, result) in classified.iter().enumerate() {
            if result.category != OrderCategory::Bulk {
                continue;
            }
            let Some(order) = order_index.get(result.order_id.as_str()) else {
                continue;
            };
            let Some(batch_id) = &order.batch_id else {
                continue;
            };
            groups
                .entry((batch_id.clone(), result.signature.signature.clone()))
                .or_default()
                .push(idx);
        }
        if groups.is_empty() {
            return Ok(0);
        }

        // 只重建 BULK 类型批次, 每个批次先清掉旧的 PENDING 子批
        let mut touched_batches: Vec<String> = groups.keys().map(|(b, _)| b.clone()).collect();
        touched_batches.sort();
        touched_batches.dedup();
        touched_batches.retain(|batch_id| {
            matches!(
                self.batch_repo.find_by_id(batch_id),
                Ok(Some(batch)) if batch.batch_type == BatchType::Bulk
            )
        });
        for batch_id in &touched_batches {
            // 先解绑订单引用再删子批, 否则外键约束会拒绝删除
            self.order_repo.clear_pending_bulk_refs(batch_id)?;
            self.bulk_batch_repo.delete_pending_by_batch(batch_id)?;
        }

        let capacity = self.settings.bulk_split_capacity();
        let now = chrono::Local::now().naive_local();
        let mut rebuilt = 0;

        let mut sorted_groups: Vec<(&(String, String), &Vec<usize>)> = groups.iter().collect();
        sorted_groups.sort_by_key(|(key, _)| (*key).clone());
        for ((batch_id, signature), indices) in sorted_groups.into_iter().map(|(k, v)| (k, v)) {
            if !touched_batches.contains(batch_id) {
                continue;
            }

            let normalized_items = &classified[indices[0]].signature.normalized_items;
            let bulk_batches = self.splitter.build_bulk_batches(
                batch_id,
                signature,
                normalized_items,
                indices.len(),
                capacity,
                now,
            );

            // 组内订单按子批大小顺次绑定
            let mut cursor = 0usize;
            for bulk_batch in &bulk_batches {
                self.bulk_batch_repo.insert(bulk_batch)?;
                let member_ids: Vec<String> = indices
                    [cursor..cursor + bulk_batch.order_count as usize]
                    .iter()
                    .map(|&idx| classified[idx].order_id.clone())
                    .collect();
                cursor += bulk_batch.order_count as usize;
                self.order_repo
                    .assign_bulk_batch(&member_ids, &bulk_batch.bulk_batch_id)?;
                rebuilt += 1;
            }
        }

        Ok(rebuilt)
    }
}
