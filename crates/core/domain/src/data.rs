use serde::{Deserialize, Serialize};
use std::fmt;

/// 点位值（读回值与下发值）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PointValue {
    Bool(bool),
    Real(f64),
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", u8::from(*value)),
            Self::Real(value) => write!(f, "{}", value),
        }
    }
}

/// 外部写入请求携带的原始值（尚未按点位类型强制转换）。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WriteValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for WriteValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for WriteValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for WriteValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for WriteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}
