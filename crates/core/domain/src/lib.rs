//! 网关领域模型：设备端点、点位定义与点位值。
//!
//! 所有模块共享的类型集中在此，协议层、调度层与网关外壳都只依赖这里的定义。

pub mod data;
pub mod endpoint;
pub mod point;

pub use data::{PointValue, WriteValue};
pub use endpoint::DeviceEndpoint;
pub use point::{DEFAULT_POLL_PERIOD, Point, PointKind, PollState};

/// 配置或输入值校验失败。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid IP address: {0}")]
    Host(String),
    #[error("port number must be between 0 and 65535, got {0}")]
    Port(i64),
    #[error("invalid point `{name}`: {reason}")]
    Point { name: String, reason: String },
    #[error("invalid value for point `{name}`: {value}")]
    Value { name: String, value: String },
}
