//! HTTP 响应辅助函数和 DTO 转换
//!
//! 调度层错误到 HTTP 状态码的映射：
//! - 未知点位 → 404
//! - 写入值非法 / 设备未应答 OK → 422
//! - 设备链路或读响应错误 → 502

use api_contract::{ApiResponse, PointDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use phd_scheduler::{PointSnapshot, SchedulerError};

/// 调度层错误响应
pub fn scheduler_error(err: SchedulerError) -> Response {
    let (status, code) = match &err {
        SchedulerError::UnknownPoint(_) => (StatusCode::NOT_FOUND, "POINT.NOT_FOUND"),
        SchedulerError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "POINT.WRITE_REJECTED"),
        SchedulerError::Device(_) => (StatusCode::BAD_GATEWAY, "DEVICE.UNAVAILABLE"),
        SchedulerError::DuplicatePoint(_) => (StatusCode::CONFLICT, "POINT.DUPLICATE"),
    };
    (status, Json(ApiResponse::<()>::error(code, err.to_string()))).into_response()
}

/// 点位快照转 DTO
pub fn point_to_dto(prefix: &str, snapshot: PointSnapshot) -> PointDto {
    let point = snapshot.point;
    PointDto {
        pv: format!("{}{}", prefix, point.name),
        poll_period_seconds: point.poll_period.as_secs_f64(),
        name: point.name,
        kind: point.kind,
        bus: point.bus,
        index: point.index,
        readback: snapshot.readback,
        commanded: snapshot.commanded,
        poll_state: snapshot.poll_state,
        last_error: snapshot.last_error,
        readback_at_ms: snapshot.readback_at_ms,
    }
}
