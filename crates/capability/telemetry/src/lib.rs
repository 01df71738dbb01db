//! 日志初始化、请求 ID 与可注入的网关指标。
//!
//! 指标实例由网关外壳在启动时创建，并在构造时传给设备链路与调度器，
//! 生命周期与网关进程一致。

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub writes_ok: u64,
    pub writes_rejected: u64,
    pub writes_failed: u64,
    pub exchanges: u64,
    pub exchange_latency_ms_total: u64,
}

/// 网关指标。
#[derive(Debug, Default)]
pub struct Telemetry {
    polls_ok: AtomicU64,
    polls_failed: AtomicU64,
    writes_ok: AtomicU64,
    writes_rejected: AtomicU64,
    writes_failed: AtomicU64,
    exchanges: AtomicU64,
    exchange_latency_ms_total: AtomicU64,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls_ok: self.polls_ok.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            writes_ok: self.writes_ok.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            exchanges: self.exchanges.load(Ordering::Relaxed),
            exchange_latency_ms_total: self.exchange_latency_ms_total.load(Ordering::Relaxed),
        }
    }

    /// 记录轮询成功次数。
    pub fn record_poll_success(&self) {
        self.polls_ok.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录轮询失败次数（读回值保持不变）。
    pub fn record_poll_failure(&self) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录写入成功次数。
    pub fn record_write_success(&self) {
        self.writes_ok.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录设备拒绝写入（非 OK 应答）次数。
    pub fn record_write_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录写入链路失败次数。
    pub fn record_write_failure(&self) {
        self.writes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次设备收发及其耗时（毫秒）。
    pub fn record_exchange_latency_ms(&self, latency_ms: u64) {
        self.exchanges.fetch_add(1, Ordering::Relaxed);
        self.exchange_latency_ms_total
            .fetch_add(latency_ms, Ordering::Relaxed);
    }
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id。
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
