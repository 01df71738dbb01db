//! 网关运行配置加载与校验。
//!
//! 原始设置（[`GatewaySettings`]）来自环境变量，可被命令行覆盖；
//! [`GatewayConfig::from_settings`] 是唯一的构造路径，任一字段非法即整体拒绝。

use domain::{DEFAULT_POLL_PERIOD, DeviceEndpoint, Point, PointKind, ValidationError};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "172.17.1.14";
pub const DEFAULT_PORT: i64 = 4011;
pub const DEFAULT_PREFIX: &str = "Portenta:";
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 3000;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("point table {path}: {reason}")]
    PointsFile { path: String, reason: String },
}

/// 未校验的原始设置。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewaySettings {
    pub host: Option<String>,
    pub port: Option<i64>,
    pub prefix: Option<String>,
    pub http_addr: Option<String>,
    pub points_file: Option<PathBuf>,
    pub connect_timeout_ms: Option<u64>,
    pub io_timeout_ms: Option<u64>,
    pub poll_period_seconds: Option<f64>,
}

impl GatewaySettings {
    /// 从环境变量读取设置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: read_optional("PHD_HOST"),
            port: read_optional_parsed("PHD_PORT")?,
            prefix: read_optional("PHD_PREFIX"),
            http_addr: read_optional("PHD_HTTP_ADDR"),
            points_file: read_optional("PHD_POINTS_FILE").map(PathBuf::from),
            connect_timeout_ms: read_optional_parsed("PHD_CONNECT_TIMEOUT_MS")?,
            io_timeout_ms: read_optional_parsed("PHD_IO_TIMEOUT_MS")?,
            poll_period_seconds: read_optional_parsed("PHD_POLL_PERIOD_SECONDS")?,
        })
    }

    /// 用 `overrides` 中已设置的字段覆盖当前设置。
    pub fn overridden_by(self, overrides: GatewaySettings) -> Self {
        Self {
            host: overrides.host.or(self.host),
            port: overrides.port.or(self.port),
            prefix: overrides.prefix.or(self.prefix),
            http_addr: overrides.http_addr.or(self.http_addr),
            points_file: overrides.points_file.or(self.points_file),
            connect_timeout_ms: overrides.connect_timeout_ms.or(self.connect_timeout_ms),
            io_timeout_ms: overrides.io_timeout_ms.or(self.io_timeout_ms),
            poll_period_seconds: overrides.poll_period_seconds.or(self.poll_period_seconds),
        }
    }
}

/// 已校验的网关配置。
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub endpoint: DeviceEndpoint,
    /// 点位对外名称前缀
    pub prefix: String,
    pub http_addr: SocketAddr,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    pub points: Vec<Point>,
}

impl GatewayConfig {
    /// 校验全部设置并构造配置。
    pub fn from_settings(settings: GatewaySettings) -> Result<Self, ConfigError> {
        let endpoint = DeviceEndpoint::parse(
            settings.host.as_deref().unwrap_or(DEFAULT_HOST),
            settings.port.unwrap_or(DEFAULT_PORT),
        )?;
        let prefix = settings
            .prefix
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let http_addr_raw = settings
            .http_addr
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = http_addr_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid("http_addr".to_string(), http_addr_raw.clone()))?;
        let connect_timeout = positive_millis(
            "connect_timeout_ms",
            settings.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
        )?;
        let io_timeout = positive_millis(
            "io_timeout_ms",
            settings.io_timeout_ms.unwrap_or(DEFAULT_IO_TIMEOUT_MS),
        )?;
        let default_period = match settings.poll_period_seconds {
            Some(seconds) => period_from_secs(seconds).ok_or_else(|| {
                ConfigError::Invalid("poll_period_seconds".to_string(), seconds.to_string())
            })?,
            None => DEFAULT_POLL_PERIOD,
        };
        let points = match &settings.points_file {
            Some(path) => load_point_table(path, default_period)?,
            None => default_points(default_period)?,
        };

        Ok(Self {
            endpoint,
            prefix,
            http_addr,
            connect_timeout,
            io_timeout,
            points,
        })
    }
}

/// 点位表中的一条定义。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointDefinition {
    pub name: String,
    pub kind: PointKind,
    pub bus: String,
    pub index: u32,
    #[serde(default)]
    pub poll_period_seconds: Option<f64>,
    #[serde(default = "default_field")]
    pub field: isize,
    #[serde(default)]
    pub strip: String,
}

fn default_field() -> isize {
    -1
}

impl PointDefinition {
    fn into_point(self, default_period: Duration) -> Result<Point, ValidationError> {
        let poll_period = match self.poll_period_seconds {
            Some(seconds) => period_from_secs(seconds).ok_or_else(|| ValidationError::Point {
                name: self.name.clone(),
                reason: format!("poll period must be positive, got {}", seconds),
            })?,
            None => default_period,
        };
        Ok(Point::new(self.name, self.kind, self.bus, self.index, poll_period)?
            .with_field(self.field, self.strip))
    }
}

/// 解析 JSON 点位表（数组）。
pub fn parse_point_table(json: &str, default_period: Duration) -> Result<Vec<Point>, ConfigError> {
    let definitions: Vec<PointDefinition> =
        serde_json::from_str(json).map_err(|e| ConfigError::PointsFile {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
    let points = definitions
        .into_iter()
        .map(|definition| definition.into_point(default_period))
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique(&points)?;
    if points.is_empty() {
        return Err(ConfigError::Invalid(
            "points".to_string(),
            "no points configured".to_string(),
        ));
    }
    Ok(points)
}

fn load_point_table(path: &Path, default_period: Duration) -> Result<Vec<Point>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|e| ConfigError::PointsFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_point_table(&json, default_period).map_err(|err| match err {
        ConfigError::PointsFile { reason, .. } => ConfigError::PointsFile {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 内置点位表：数字输出 0 与注射器直径（模拟输出 0）。
pub fn default_points(period: Duration) -> Result<Vec<Point>, ValidationError> {
    Ok(vec![
        Point::new("do0", PointKind::Boolean, "DO", 0, period)?,
        Point::new("diameter", PointKind::Real, "AO", 0, period)?,
    ])
}

fn ensure_unique(points: &[Point]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for point in points {
        if !seen.insert(point.name.as_str()) {
            return Err(ValidationError::Point {
                name: point.name.clone(),
                reason: "duplicate point name".to_string(),
            });
        }
    }
    Ok(())
}

fn period_from_secs(seconds: f64) -> Option<Duration> {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

fn positive_millis(key: &str, value: u64) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(key.to_string(), value.to_string()));
    }
    Ok(Duration::from_millis(value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_optional_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match read_optional(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        None => Ok(None),
    }
}
