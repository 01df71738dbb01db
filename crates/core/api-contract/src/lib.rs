//! 点位暴露服务的 DTO 与 API 响应契约。

use domain::{PointKind, PointValue, PollState, WriteValue};
use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 点位返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointDto {
    /// 对外名称（前缀 + 点位名）
    pub pv: String,
    pub name: String,
    pub kind: PointKind,
    pub bus: String,
    pub index: u32,
    pub poll_period_seconds: f64,
    pub readback: Option<PointValue>,
    pub commanded: Option<PointValue>,
    pub poll_state: PollState,
    pub last_error: Option<String>,
    pub readback_at_ms: Option<i64>,
}

/// 点位写入请求体。
#[derive(Debug, Deserialize)]
pub struct WritePointRequest {
    pub value: WriteValue,
}

/// 点位写入响应体。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritePointResponse {
    pub pv: String,
    pub commanded: PointValue,
}

/// 网关运行状态。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatusDto {
    pub endpoint: String,
    pub points: usize,
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub writes_ok: u64,
    pub writes_rejected: u64,
    pub writes_failed: u64,
}
