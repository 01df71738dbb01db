//! 点位定义。

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认轮询周期（秒）。
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(6);

/// 点位类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    /// 数字量（0/1）
    #[serde(alias = "bool", alias = "digital")]
    Boolean,
    /// 模拟量（浮点）
    #[serde(alias = "float", alias = "analog")]
    Real,
}

/// 点位轮询状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// 尚无成功读取
    Unpolled,
    /// 至少成功读取过一次
    Polled,
}

/// 设备上的一个 I/O 点位。
///
/// 启动时由静态配置创建，进程生命周期内不增删。
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub name: String,
    pub kind: PointKind,
    /// 通道类别（如 `DO`、`AO`）
    pub bus: String,
    /// 通道号
    pub index: u32,
    pub poll_period: Duration,
    /// 读响应首行中取值字段的下标，负数表示从末尾计
    pub field: isize,
    /// 取值前从字段右侧剥离的字符
    pub strip: String,
}

impl Point {
    /// 构造点位并校验（读取末字段、不剥离字符）。
    pub fn new(
        name: impl Into<String>,
        kind: PointKind,
        bus: impl Into<String>,
        index: u32,
        poll_period: Duration,
    ) -> Result<Self, ValidationError> {
        let point = Self {
            name: name.into(),
            kind,
            bus: bus.into(),
            index,
            poll_period,
            field: -1,
            strip: String::new(),
        };
        point.validate()?;
        Ok(point)
    }

    /// 指定读响应中的字段下标与剥离字符。
    pub fn with_field(mut self, field: isize, strip: impl Into<String>) -> Self {
        self.field = field;
        self.strip = strip.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::Point {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.bus.trim().is_empty() || self.bus.chars().any(char::is_whitespace) {
            return Err(invalid("bus must be a single non-empty token"));
        }
        if self.poll_period.is_zero() {
            return Err(invalid("poll period must be positive"));
        }
        Ok(())
    }
}
