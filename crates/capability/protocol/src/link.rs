//! 设备链路：每次逻辑操作独占一个 TCP 连接。
//!
//! 连接 → 发送 → 单次有界接收 → 关闭。设备响应假定能放进一个接收缓冲区，
//! 不做分片重组。连接在任何返回路径上都会被释放（随 `TcpStream` drop 关闭）。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let endpoint = DeviceEndpoint::parse("172.17.1.14", 4011)?;
//! let link = DeviceLink::new(endpoint, LinkTimeouts::default(), telemetry);
//! let response = link.read().await?;
//! let value = decode_read(&response, -1, "")?;
//! ```

use crate::codec::encode_read;
use crate::error::ProtocolError;
use async_trait::async_trait;
use domain::DeviceEndpoint;
use phd_telemetry::Telemetry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// 单次接收缓冲区大小（字节）
pub const RECV_BUFFER_SIZE: usize = 1024;

/// 链路超时配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTimeouts {
    /// 建立连接的截止时间
    pub connect: Duration,
    /// 发送及等待响应的截止时间
    pub io: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(3000),
            io: Duration::from_millis(3000),
        }
    }
}

/// 设备收发抽象。
///
/// 调度器只依赖该 trait，测试中可替换为脚本化实现。
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// 发送一帧并返回设备的原始文本响应。
    async fn exchange(&self, frame: &[u8]) -> Result<String, ProtocolError>;

    /// 发送固定读请求。
    async fn read(&self) -> Result<String, ProtocolError> {
        self.exchange(encode_read()).await
    }

    /// 发送已编码的写请求。
    async fn write(&self, frame: &[u8]) -> Result<String, ProtocolError> {
        self.exchange(frame).await
    }
}

/// 单设备 TCP 链路
pub struct DeviceLink {
    endpoint: DeviceEndpoint,
    timeouts: LinkTimeouts,
    telemetry: Arc<Telemetry>,
}

impl DeviceLink {
    pub fn new(endpoint: DeviceEndpoint, timeouts: LinkTimeouts, telemetry: Arc<Telemetry>) -> Self {
        Self {
            endpoint,
            timeouts,
            telemetry,
        }
    }

    async fn round_trip(&self, frame: &[u8]) -> Result<String, ProtocolError> {
        let addr = self.endpoint.socket_addr();
        let mut stream = match timeout(self.timeouts.connect, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ProtocolError::Connection(format!(
                    "failed to connect to {}: {}",
                    addr, e
                )));
            }
            Err(_) => {
                return Err(ProtocolError::Connection(format!(
                    "connect to {} timed out after {}ms",
                    addr,
                    self.timeouts.connect.as_millis()
                )));
            }
        };

        match timeout(self.timeouts.io, stream.write_all(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ProtocolError::Connection(format!("send failed: {}", e)));
            }
            Err(_) => {
                return Err(ProtocolError::Connection("send timed out".to_string()));
            }
        }

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let received = match timeout(self.timeouts.io, stream.read(&mut buffer)).await {
            Ok(Ok(0)) => {
                return Err(ProtocolError::Connection(
                    "connection closed before response".to_string(),
                ));
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                return Err(ProtocolError::Connection(format!("receive failed: {}", e)));
            }
            Err(_) => {
                return Err(ProtocolError::Timeout(format!(
                    "no response from {} within {}ms",
                    addr,
                    self.timeouts.io.as_millis()
                )));
            }
        };

        // 关闭写端，连接随 stream drop 释放
        let _ = stream.shutdown().await;
        Ok(String::from_utf8_lossy(&buffer[..received]).into_owned())
    }
}

#[async_trait]
impl DeviceTransport for DeviceLink {
    async fn exchange(&self, frame: &[u8]) -> Result<String, ProtocolError> {
        let started = Instant::now();
        let result = self.round_trip(frame).await;
        self.telemetry
            .record_exchange_latency_ms(started.elapsed().as_millis() as u64);
        let request = String::from_utf8_lossy(frame);
        match &result {
            Ok(response) => debug!(
                target: "phd.link",
                endpoint = %self.endpoint,
                request = %request.trim_end(),
                response = %response.trim_end(),
                "device exchange"
            ),
            Err(err) => debug!(
                target: "phd.link",
                endpoint = %self.endpoint,
                request = %request.trim_end(),
                error = %err,
                "device exchange failed"
            ),
        }
        result
    }
}
