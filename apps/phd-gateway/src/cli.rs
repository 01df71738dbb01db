//! 命令行参数（覆盖环境变量中的同名设置）。

use clap::Parser;
use phd_config::GatewaySettings;
use std::path::PathBuf;

/// Gateway for accessing I/O on a networked PhD device over its line protocol.
#[derive(Debug, Parser)]
#[command(name = "phd-gateway", version)]
pub struct Cli {
    /// IP address of the device
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port of the device
    #[arg(long, allow_negative_numbers = true)]
    pub port: Option<i64>,

    /// Prefix for externally visible point names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Listen address of the point server
    #[arg(long)]
    pub http_addr: Option<String>,

    /// JSON point table (defaults to the built-in table)
    #[arg(long)]
    pub points: Option<PathBuf>,

    /// Default poll period in seconds
    #[arg(long)]
    pub poll_period: Option<f64>,

    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    #[arg(long)]
    pub io_timeout_ms: Option<u64>,
}

impl Cli {
    pub fn into_settings(self) -> GatewaySettings {
        GatewaySettings {
            host: self.host,
            port: self.port,
            prefix: self.prefix,
            http_addr: self.http_addr,
            points_file: self.points,
            connect_timeout_ms: self.connect_timeout_ms,
            io_timeout_ms: self.io_timeout_ms,
            poll_period_seconds: self.poll_period,
        }
    }
}
