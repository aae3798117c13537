// ==========================================
// 仓储拣选编排系统 - 拣选操作 API
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 6. 外部接口 (动作端点 + 查询端点)
// 职责: 输入校验、编排引擎调用、错误转换
// 红线: 校验失败必须在任何事务开始之前拒绝, 零副作用
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::SettingsManager;
use crate::domain::batch::{BulkBatch, Cell};
use crate::domain::cart::Cart;
use crate::domain::chunk::{Chunk, EngravingProgress};
use crate::domain::order::Order;
use crate::engine::allocator::{ChunkAllocator, ClaimLimits, ClaimTarget};
use crate::engine::lifecycle::LifecycleManager;
use crate::repository::bulk_batch_repo::BulkBatchRepository;
use crate::repository::cart_repo::CartRepository;
use crate::repository::cell_repo::CellRepository;
use crate::repository::chunk_repo::ChunkRepository;
use crate::repository::order_repo::OrderRepository;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 领取请求
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimChunkRequest {
    pub cart_id: String,
    pub picker_name: String,
    /// 非个性化领取必填
    pub cell_id: Option<String>,
    /// 个性化池领取 (不绑拣选区)
    #[serde(default)]
    pub personalized: bool,
}

/// 刻字进度检查点载荷
#[derive(Debug, Clone, Deserialize)]
pub struct EngravingCheckpointRequest {
    pub chunk_id: String,
    pub completed_indices: Vec<usize>,
    pub current_index: usize,
    #[serde(default)]
    pub total_paused_ms: i64,
}

/// chunk 详情 (含在册订单)
#[derive(Debug, Serialize)]
pub struct ChunkDetail {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub orders: Vec<Order>,
    /// 批量 chunk 的货架绑定 (层号升序), 其余模式为空
    pub shelves: Vec<ShelfDetail>,
}

/// 货架层 -> 子批 的绑定详情
#[derive(Debug, Serialize)]
pub struct ShelfDetail {
    pub shelf_number: i32,
    pub bulk_batch: BulkBatch,
}

// ==========================================
// PickingApi
// ==========================================
pub struct PickingApi {
    allocator: Arc<ChunkAllocator>,
    lifecycle: Arc<LifecycleManager>,
    settings: Arc<SettingsManager>,
    cart_repo: Arc<CartRepository>,
    cell_repo: Arc<CellRepository>,
    chunk_repo: Arc<ChunkRepository>,
    order_repo: Arc<OrderRepository>,
    bulk_batch_repo: Arc<BulkBatchRepository>,
}

impl PickingApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        allocator: Arc<ChunkAllocator>,
        lifecycle: Arc<LifecycleManager>,
        settings: Arc<SettingsManager>,
        cart_repo: Arc<CartRepository>,
        cell_repo: Arc<CellRepository>,
        chunk_repo: Arc<ChunkRepository>,
        order_repo: Arc<OrderRepository>,
        bulk_batch_repo: Arc<BulkBatchRepository>,
    ) -> Self {
        Self {
            allocator,
            lifecycle,
            settings,
            cart_repo,
            cell_repo,
            chunk_repo,
            order_repo,
            bulk_batch_repo,
        }
    }

    // ==========================================
    // 动作端点
    // ==========================================

    /// claim-chunk: 领取一个拣选 chunk
    pub fn claim_chunk(&self, req: &ClaimChunkRequest) -> ApiResult<Chunk> {
        if req.cart_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("cart_id 不能为空".to_string()));
        }
        if req.picker_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("picker_name 不能为空".to_string()));
        }

        let target = if req.personalized {
            ClaimTarget::Personalized
        } else {
            match &req.cell_id {
                Some(cell_id) if !cell_id.trim().is_empty() => {
                    ClaimTarget::Cell(cell_id.clone())
                }
                _ => {
                    return Err(ApiError::InvalidInput(
                        "非个性化领取必须给出 cell_id".to_string(),
                    ))
                }
            }
        };

        let limits = ClaimLimits {
            max_bins_standard: self.settings.max_bins(false),
            max_bins_oversized: self.settings.max_bins(true),
            orders_per_bin: self.settings.orders_per_bin(),
            shelves_per_chunk: self.settings.shelves_per_chunk(),
        };

        let chunk = self
            .allocator
            .claim_chunk(&req.cart_id, &req.picker_name, target, limits)?;
        Ok(chunk)
    }

    /// complete-bin: 确认单个格位完成
    pub fn complete_bin(&self, chunk_id: &str, bin_number: i32) -> ApiResult<()> {
        Self::require_chunk_id(chunk_id)?;
        if bin_number < 1 {
            return Err(ApiError::InvalidInput(format!(
                "格位号必须为正数: {}",
                bin_number
            )));
        }
        self.lifecycle.complete_bin(chunk_id, bin_number)?;
        Ok(())
    }

    /// complete-chunk: 完成整个 chunk
    pub fn complete_chunk(&self, chunk_id: &str) -> ApiResult<Chunk> {
        Self::require_chunk_id(chunk_id)?;
        Ok(self.lifecycle.complete_chunk(chunk_id)?)
    }

    /// out-of-stock: 缺货释放指定格位
    pub fn out_of_stock(&self, chunk_id: &str, bin_numbers: &[i32]) -> ApiResult<Chunk> {
        Self::require_chunk_id(chunk_id)?;
        if bin_numbers.is_empty() {
            return Err(ApiError::InvalidInput("bin_numbers 不能为空".to_string()));
        }
        Ok(self.lifecycle.out_of_stock(chunk_id, bin_numbers)?)
    }

    /// cancel-chunk: 取消 chunk
    pub fn cancel_chunk(&self, chunk_id: &str, reason: Option<&str>) -> ApiResult<Chunk> {
        Self::require_chunk_id(chunk_id)?;
        Ok(self.lifecycle.cancel_chunk(chunk_id, reason)?)
    }

    /// start-engraving: 开始刻字
    pub fn start_engraving(&self, chunk_id: &str, engraver_name: &str) -> ApiResult<Chunk> {
        Self::require_chunk_id(chunk_id)?;
        if engraver_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("engraver_name 不能为空".to_string()));
        }
        Ok(self.lifecycle.start_engraving(chunk_id, engraver_name)?)
    }

    /// mark-engraved-item: 写入刻字进度检查点
    pub fn mark_engraved_item(&self, req: &EngravingCheckpointRequest) -> ApiResult<Chunk> {
        Self::require_chunk_id(&req.chunk_id)?;
        let progress = EngravingProgress {
            completed_indices: req.completed_indices.iter().copied().collect::<BTreeSet<_>>(),
            current_index: req.current_index,
            total_paused_ms: req.total_paused_ms,
        };
        Ok(self.lifecycle.mark_engraved_item(&req.chunk_id, progress)?)
    }

    /// mark-engraved: 整体标记已刻
    pub fn mark_engraved(&self, chunk_id: &str) -> ApiResult<Chunk> {
        Self::require_chunk_id(chunk_id)?;
        Ok(self.lifecycle.mark_engraved(chunk_id)?)
    }

    /// complete-engraving: 完成刻字
    pub fn complete_engraving(&self, chunk_id: &str) -> ApiResult<Chunk> {
        Self::require_chunk_id(chunk_id)?;
        Ok(self.lifecycle.complete_engraving(chunk_id)?)
    }

    /// cancel-engraving: 取消刻字 (仅零件已刻)
    pub fn cancel_engraving(&self, chunk_id: &str) -> ApiResult<Chunk> {
        Self::require_chunk_id(chunk_id)?;
        Ok(self.lifecycle.cancel_engraving(chunk_id)?)
    }

    // ==========================================
    // 查询端点
    // ==========================================

    /// 可用拣选车列表
    pub fn list_available_carts(&self) -> ApiResult<Vec<Cart>> {
        Ok(self.cart_repo.list_available()?)
    }

    /// 启用中的拣选区列表
    pub fn list_cells(&self) -> ApiResult<Vec<Cell>> {
        Ok(self.cell_repo.list_active()?)
    }

    /// 拣选区内的进行中 chunk 列表
    pub fn list_chunks_for_cell(&self, cell_id: &str) -> ApiResult<Vec<Chunk>> {
        if cell_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("cell_id 不能为空".to_string()));
        }
        Ok(self.chunk_repo.list_active_by_cell(cell_id)?)
    }

    /// 个性化订单积压数
    pub fn personalized_backlog(&self) -> ApiResult<i64> {
        Ok(self.order_repo.count_personalized_backlog()?)
    }

    /// chunk 详情 (含在册订单, 按格位号排序)
    pub fn get_chunk(&self, chunk_id: &str) -> ApiResult<ChunkDetail> {
        Self::require_chunk_id(chunk_id)?;
        let chunk = self
            .chunk_repo
            .find_by_id(chunk_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Chunk(id={})不存在", chunk_id)))?;
        let orders = self.order_repo.find_by_chunk(chunk_id)?;
        let shelves = self.load_shelves(chunk_id)?;
        Ok(ChunkDetail {
            chunk,
            orders,
            shelves,
        })
    }

    /// 拼装货架绑定详情, 非批量 chunk 无绑定
    fn load_shelves(&self, chunk_id: &str) -> ApiResult<Vec<ShelfDetail>> {
        let assignments = self.chunk_repo.find_shelves(chunk_id)?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = assignments
            .iter()
            .map(|a| a.bulk_batch_id.clone())
            .collect();
        let mut by_id: HashMap<String, BulkBatch> = self
            .bulk_batch_repo
            .find_by_ids(&ids)?
            .into_iter()
            .map(|bb| (bb.bulk_batch_id.clone(), bb))
            .collect();

        let mut shelves = Vec::with_capacity(assignments.len());
        for a in assignments {
            if let Some(bulk_batch) = by_id.remove(&a.bulk_batch_id) {
                shelves.push(ShelfDetail {
                    shelf_number: a.shelf_number,
                    bulk_batch,
                });
            }
        }
        Ok(shelves)
    }

    fn require_chunk_id(chunk_id: &str) -> ApiResult<()> {
        if chunk_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("chunk_id 不能为空".to_string()));
        }
        Ok(())
    }
}
