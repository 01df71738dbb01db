//! # 设备协议能力模块
//!
//! 设备使用基于行的 ASCII 文本协议，每个 TCP 连接只承载一次请求/响应：
//!
//! ```text
//! 读请求:  "parameter\n"
//! 读响应:  "<f0> <f1> ... <fn>\n<status>\n"
//! 写请求:  "SET <bus> <pin> <value>\n"
//! 写响应:  "OK"
//! ```
//!
//! ## 架构设计
//!
//! ```text
//! PointScheduler
//!       │  (encode_* / coerce_write)
//!       ▼
//! DeviceTransport ── DeviceLink (connect → send → recv → close)
//!       │  (decode_read / decode_write_ack)
//!       ▼
//! 设备
//! ```
//!
//! 读请求固定不变，设备每次返回完整状态行，由调用方按点位配置的字段下标取值。

mod codec;
mod error;
mod link;

pub use codec::{
    READ_FRAME, ReadResponse, coerce_write, decode_read, decode_write_ack, encode_read,
    encode_write, parse_read_response,
};
pub use error::ProtocolError;
pub use link::{DeviceLink, DeviceTransport, LinkTimeouts, RECV_BUFFER_SIZE};
