//! 行协议编解码与写入值强制转换。
//!
//! 编解码均为同步纯函数，不做任何 IO。

use crate::error::ProtocolError;
use domain::{Point, PointKind, PointValue, ValidationError, WriteValue};
use std::fmt::Display;

/// 固定的读请求帧：设备每次都返回完整状态，与要读取的点位无关。
pub const READ_FRAME: &[u8] = b"parameter\n";

/// 数字量写入时视为"开"的文本（不区分大小写）。
const TRUTHY: [&str; 3] = ["on", "1", "true"];

/// 读响应：首行数值字段 + 次行状态行。
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    pub fields: Vec<String>,
    /// 状态行内容（目前只记录，不校验）
    pub status: Option<String>,
}

impl ReadResponse {
    /// 按下标取字段并转换为浮点数，负下标从末尾计。
    pub fn field(&self, index: isize, strip: &str) -> Result<f64, ProtocolError> {
        let len = self.fields.len() as isize;
        let position = if index < 0 { len + index } else { index };
        if position < 0 || position >= len {
            return Err(ProtocolError::Parse(format!(
                "field {} out of range ({} fields)",
                index, len
            )));
        }
        let raw = &self.fields[position as usize];
        let trimmed = raw.trim_end_matches(|c: char| strip.contains(c));
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ProtocolError::Parse(format!(
                "field {} is not numeric: {:?}",
                index, raw
            ))),
        }
    }
}

/// 编码读请求。
pub fn encode_read() -> &'static [u8] {
    READ_FRAME
}

/// 编码写请求：`SET {bus} {pin} {value}\n`。
pub fn encode_write(bus: &str, pin: u32, value: impl Display) -> Vec<u8> {
    format!("SET {} {} {}\n", bus, pin, value).into_bytes()
}

/// 拆分读响应。首行缺失或为空时返回解析错误。
pub fn parse_read_response(response: &str) -> Result<ReadResponse, ProtocolError> {
    let mut lines = response.trim().lines();
    let first = lines
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or_else(|| ProtocolError::Parse("missing data line".to_string()))?;
    let status = lines
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string);
    Ok(ReadResponse {
        fields: first.split_whitespace().map(str::to_string).collect(),
        status,
    })
}

/// 解码读响应中指定字段的数值。
pub fn decode_read(response: &str, field: isize, strip: &str) -> Result<f64, ProtocolError> {
    parse_read_response(response)?.field(field, strip)
}

/// 解码写应答：去除首尾空白后必须严格等于 `OK`。
pub fn decode_write_ack(response: &str) -> Result<(), ProtocolError> {
    if response.trim() == "OK" {
        Ok(())
    } else {
        Err(ProtocolError::Protocol(response.to_string()))
    }
}

/// 按点位类型把外部写入值转换为下发值。
///
/// 数字量一律落到 0/1；模拟量要求有限数值，文本需能解析为浮点数。
pub fn coerce_write(point: &Point, value: &WriteValue) -> Result<PointValue, ProtocolError> {
    let invalid = || ValidationError::Value {
        name: point.name.clone(),
        value: value.to_string(),
    };
    let coerced = match (point.kind, value) {
        (PointKind::Boolean, WriteValue::Bool(flag)) => PointValue::Bool(*flag),
        (PointKind::Boolean, WriteValue::Number(number)) => PointValue::Bool(*number != 0.0),
        (PointKind::Boolean, WriteValue::Text(text)) => {
            let text = text.trim().to_ascii_lowercase();
            PointValue::Bool(TRUTHY.contains(&text.as_str()))
        }
        (PointKind::Real, WriteValue::Bool(flag)) => PointValue::Real(f64::from(u8::from(*flag))),
        (PointKind::Real, WriteValue::Number(number)) if number.is_finite() => {
            PointValue::Real(*number)
        }
        (PointKind::Real, WriteValue::Text(text)) => match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => PointValue::Real(number),
            _ => return Err(invalid().into()),
        },
        (PointKind::Real, WriteValue::Number(_)) => return Err(invalid().into()),
    };
    Ok(coerced)
}
