//! 点位 handlers
//!
//! - GET /health - 网关状态与计数
//! - GET /points - 列出全部点位
//! - GET /points/:name - 点位读回值、下发值与轮询状态
//! - PUT /points/:name - 写入点位（同步等待设备应答）
//!
//! `:name` 既可以是点位名，也可以是带前缀的对外名称。

use crate::AppState;
use crate::utils::response::{point_to_dto, scheduler_error};
use api_contract::{ApiResponse, GatewayStatusDto, WritePointRequest, WritePointResponse};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

/// 网关状态
pub async fn health(State(state): State<AppState>) -> Response {
    let snapshot = state.telemetry.snapshot();
    let status = GatewayStatusDto {
        endpoint: state.endpoint.clone(),
        points: state.scheduler.points().len(),
        polls_ok: snapshot.polls_ok,
        polls_failed: snapshot.polls_failed,
        writes_ok: snapshot.writes_ok,
        writes_rejected: snapshot.writes_rejected,
        writes_failed: snapshot.writes_failed,
    };
    (StatusCode::OK, Json(ApiResponse::success(status))).into_response()
}

/// 列出点位
pub async fn list_points(State(state): State<AppState>) -> Response {
    let points: Vec<_> = state
        .scheduler
        .points()
        .into_iter()
        .map(|snapshot| point_to_dto(&state.prefix, snapshot))
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(points))).into_response()
}

/// 获取点位详情
pub async fn get_point(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let name = state.point_name(&name);
    match state.scheduler.snapshot(name) {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::success(point_to_dto(&state.prefix, snapshot))),
        )
            .into_response(),
        Err(err) => scheduler_error(err),
    }
}

/// 写入点位
pub async fn write_point(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<WritePointRequest>,
) -> Response {
    let name = state.point_name(&name);
    info!(target: "phd.gateway", point = %name, value = %req.value, "write requested");
    match state.scheduler.write(name, req.value).await {
        Ok(commanded) => (
            StatusCode::OK,
            Json(ApiResponse::success(WritePointResponse {
                pv: format!("{}{}", state.prefix, name),
                commanded,
            })),
        )
            .into_response(),
        Err(err) => scheduler_error(err),
    }
}
