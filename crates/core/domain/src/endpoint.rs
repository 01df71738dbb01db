//! 设备端点（单设备网关，进程内唯一）。

use crate::ValidationError;
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// 设备 TCP 端点。
///
/// 只能通过 [`DeviceEndpoint::parse`] 构造，构造后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceEndpoint {
    host: Ipv4Addr,
    port: u16,
}

impl DeviceEndpoint {
    /// 校验并构造端点。
    ///
    /// - host 必须是严格的点分十进制 IPv4（`999.1.1.1`、`abc` 均拒绝）
    /// - port 必须在 `[0, 65535]` 内
    pub fn parse(host: &str, port: i64) -> Result<Self, ValidationError> {
        let host = parse_host(host)?;
        let port = parse_port(port)?;
        Ok(Self { host, port })
    }

    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 校验 IPv4 点分十进制地址（严格匹配，不裁剪空白）。
pub fn parse_host(host: &str) -> Result<Ipv4Addr, ValidationError> {
    host.parse::<Ipv4Addr>()
        .map_err(|_| ValidationError::Host(host.to_string()))
}

/// 校验端口号范围。
pub fn parse_port(port: i64) -> Result<u16, ValidationError> {
    u16::try_from(port).map_err(|_| ValidationError::Port(port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let endpoint = DeviceEndpoint::parse("172.17.1.14", 4011).unwrap();
        assert_eq!(endpoint.socket_addr().to_string(), "172.17.1.14:4011");
        assert_eq!(endpoint.to_string(), "172.17.1.14:4011");
    }

    #[test]
    fn test_port_bounds() {
        assert_eq!(parse_port(0), Ok(0));
        assert_eq!(parse_port(65535), Ok(65535));
        assert_eq!(parse_port(-1), Err(ValidationError::Port(-1)));
        assert_eq!(parse_port(65536), Err(ValidationError::Port(65536)));
    }
}
