// ==========================================
// 仓储拣选编排系统 - HTTP 路由
// ==========================================
// 依据: Picking_Engine_Specs_v0.2.md - 6. 外部接口 (暴露面)
// ==========================================
// 动作端点统一走 {verb, payload} 分发;
// SQLite 调用全部经 spawn_blocking, 不阻塞异步运行时
// ==========================================

use crate::api::{
    ApiError, ClaimChunkRequest, EngravingCheckpointRequest,
};
use crate::app::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// 创建路由
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/picking/actions", post(dispatch_action))
        .route("/api/picking/carts/available", get(list_available_carts))
        .route("/api/picking/cells", get(list_cells))
        .route("/api/picking/cells/{cell_id}/chunks", get(list_chunks_for_cell))
        .route("/api/picking/chunks/{chunk_id}", get(get_chunk))
        .route("/api/picking/personalized/backlog", get(personalized_backlog))
        .route("/api/orders/ingest", post(ingest_orders))
        .route("/api/orders/reclassify", post(reclassify_orders))
        .route("/api/settings", get(list_settings))
        .route("/api/settings/{key}", get(get_setting).put(update_setting))
        .with_state(state)
}

// ==========================================
// 错误 -> HTTP 响应
// ==========================================

/// HTTP 层错误包装 (api::ApiError 本身与传输无关)
pub struct HttpError(ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApiError::InvalidInput(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StateConflict(_)
            | ApiError::BusinessRuleViolation(_)
            | ApiError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type HttpResult<T> = Result<T, HttpError>;

/// 阻塞调用包装: SQLite 操作放到阻塞线程池
async fn blocking<T, F>(f: F) -> HttpResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HttpError(ApiError::InternalError(format!("任务执行失败: {}", e))))?
        .map_err(HttpError)
}

// ==========================================
// 动作分发
// ==========================================

#[derive(Debug, Deserialize)]
struct ActionRequest {
    verb: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ChunkIdPayload {
    chunk_id: String,
}

#[derive(Debug, Deserialize)]
struct CompleteBinPayload {
    chunk_id: String,
    bin_number: i32,
}

#[derive(Debug, Deserialize)]
struct OutOfStockPayload {
    chunk_id: String,
    bin_numbers: Vec<i32>,
}

#[derive(Debug, Deserialize)]
struct CancelChunkPayload {
    chunk_id: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartEngravingPayload {
    chunk_id: String,
    engraver_name: String,
}

fn parse_payload<T: serde::de::DeserializeOwned>(verb: &str, payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|e| ApiError::InvalidInput(format!("{} 载荷解析失败: {}", verb, e)))
}

async fn dispatch_action(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequest>,
) -> HttpResult<Json<Value>> {
    let api = state.picking_api.clone();
    let verb = req.verb.clone();
    let payload = req.payload;

    let result = blocking(move || -> Result<Value, ApiError> {
        match verb.as_str() {
            "claim-chunk" => {
                let p: ClaimChunkRequest = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.claim_chunk(&p)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "complete-bin" => {
                let p: CompleteBinPayload = parse_payload(&verb, payload)?;
                api.complete_bin(&p.chunk_id, p.bin_number)?;
                Ok(json!({ "ok": true }))
            }
            "complete-chunk" => {
                let p: ChunkIdPayload = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.complete_chunk(&p.chunk_id)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "out-of-stock" => {
                let p: OutOfStockPayload = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.out_of_stock(&p.chunk_id, &p.bin_numbers)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "cancel-chunk" => {
                let p: CancelChunkPayload = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.cancel_chunk(&p.chunk_id, p.reason.as_deref())?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "start-engraving" => {
                let p: StartEngravingPayload = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.start_engraving(&p.chunk_id, &p.engraver_name)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "mark-engraved-item" => {
                let p: EngravingCheckpointRequest = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.mark_engraved_item(&p)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "mark-engraved" => {
                let p: ChunkIdPayload = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.mark_engraved(&p.chunk_id)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "complete-engraving" => {
                let p: ChunkIdPayload = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.complete_engraving(&p.chunk_id)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            "cancel-engraving" => {
                let p: ChunkIdPayload = parse_payload(&verb, payload)?;
                Ok(serde_json::to_value(api.cancel_engraving(&p.chunk_id)?)
                    .map_err(|e| ApiError::InternalError(e.to_string()))?)
            }
            other => Err(ApiError::InvalidInput(format!("未知动作: {}", other))),
        }
    })
    .await?;

    Ok(Json(result))
}

// ==========================================
// 查询端点
// ==========================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_available_carts(State(state): State<Arc<AppState>>) -> HttpResult<Json<Value>> {
    let api = state.picking_api.clone();
    let carts = blocking(move || api.list_available_carts()).await?;
    Ok(Json(json!({ "carts": carts })))
}

async fn list_cells(State(state): State<Arc<AppState>>) -> HttpResult<Json<Value>> {
    let api = state.picking_api.clone();
    let cells = blocking(move || api.list_cells()).await?;
    Ok(Json(json!({ "cells": cells })))
}

async fn list_chunks_for_cell(
    State(state): State<Arc<AppState>>,
    Path(cell_id): Path<String>,
) -> HttpResult<Json<Value>> {
    let api = state.picking_api.clone();
    let chunks = blocking(move || api.list_chunks_for_cell(&cell_id)).await?;
    Ok(Json(json!({ "chunks": chunks })))
}

async fn get_chunk(
    State(state): State<Arc<AppState>>,
    Path(chunk_id): Path<String>,
) -> HttpResult<Json<Value>> {
    let api = state.picking_api.clone();
    let detail = blocking(move || api.get_chunk(&chunk_id)).await?;
    Ok(Json(
        serde_json::to_value(detail)
            .map_err(|e| HttpError(ApiError::InternalError(e.to_string())))?,
    ))
}

async fn personalized_backlog(State(state): State<Arc<AppState>>) -> HttpResult<Json<Value>> {
    let api = state.picking_api.clone();
    let backlog = blocking(move || api.personalized_backlog()).await?;
    Ok(Json(json!({ "backlog": backlog })))
}

// ==========================================
// 订单端点
// ==========================================

async fn ingest_orders(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> HttpResult<Json<Value>> {
    let api = state.order_api.clone();
    let summary = blocking(move || api.ingest(payload)).await?;
    Ok(Json(
        serde_json::to_value(summary)
            .map_err(|e| HttpError(ApiError::InternalError(e.to_string())))?,
    ))
}

async fn reclassify_orders(State(state): State<Arc<AppState>>) -> HttpResult<Json<Value>> {
    let api = state.order_api.clone();
    let summary = blocking(move || api.reclassify()).await?;
    Ok(Json(
        serde_json::to_value(summary)
            .map_err(|e| HttpError(ApiError::InternalError(e.to_string())))?,
    ))
}

// ==========================================
// 配置端点
// ==========================================

#[derive(Debug, Deserialize)]
struct UpdateSettingRequest {
    value: String,
}

async fn list_settings(State(state): State<Arc<AppState>>) -> HttpResult<Json<Value>> {
    let api = state.settings_api.clone();
    let settings = blocking(move || api.list()).await?;
    Ok(Json(json!({ "settings": settings })))
}

async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> HttpResult<Json<Value>> {
    let api = state.settings_api.clone();
    let key_for_resp = key.clone();
    let value = blocking(move || api.get(&key)).await?;
    match value {
        Some(value) => Ok(Json(json!({ "key": key_for_resp, "value": value }))),
        None => Err(ApiError::NotFound(format!("配置项不存在: {}", key_for_resp)).into()),
    }
}

async fn update_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<UpdateSettingRequest>,
) -> HttpResult<Json<Value>> {
    let api = state.settings_api.clone();
    let key_for_log = key.clone();
    blocking(move || api.set(&key, &req.value)).await?;
    Ok(Json(json!({ "ok": true, "key": key_for_log })))
}
