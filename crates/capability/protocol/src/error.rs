//! 协议错误类型定义

use domain::ValidationError;

/// 设备通信错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// 连接或发送失败（含对端提前关闭）
    #[error("connection error: {0}")]
    Connection(String),

    /// 截止时间内未收到数据
    #[error("timeout: {0}")]
    Timeout(String),

    /// 读响应缺行、字段越界或非数值
    #[error("data parse error: {0}")]
    Parse(String),

    /// 写响应不是 `OK`，携带原始响应
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// 写入值无法按点位类型转换
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ProtocolError {
    /// 传输层错误可在下一个轮询周期重试。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}
