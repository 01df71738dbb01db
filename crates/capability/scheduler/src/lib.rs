//! 点位轮询调度。
//!
//! 每个点位一个独立的周期任务：读设备 → 按点位字段解码 → 发布读回值。
//! 写入请求同步下发并等待 `OK` 应答。
//!
//! 调度模型为协作式：网络收发是唯一的挂起点，解码与强制转换都是同步的。
//! 同一点位的收发按 FIFO 串行，轮询进行中到达的写入排在其后。

use domain::{Point, PointKind, PointValue, PollState, WriteValue};
use phd_protocol::{
    DeviceTransport, ProtocolError, coerce_write, decode_write_ack, encode_write,
    parse_read_response,
};
use phd_telemetry::Telemetry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// 调度层错误。
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("unknown point: {0}")]
    UnknownPoint(String),
    #[error("point already registered: {0}")]
    DuplicatePoint(String),
    /// 点位定义非法、写入值无法转换或设备未应答 `OK`
    #[error("validation error: {0}")]
    Validation(String),
    /// 链路或读响应解析失败
    #[error("device error: {0}")]
    Device(#[from] ProtocolError),
}

/// 点位当前状态快照。
#[derive(Debug, Clone, PartialEq)]
pub struct PointSnapshot {
    pub point: Point,
    pub readback: Option<PointValue>,
    pub commanded: Option<PointValue>,
    pub poll_state: PollState,
    pub last_error: Option<String>,
    pub readback_at_ms: Option<i64>,
}

#[derive(Debug)]
struct PointState {
    readback: Option<PointValue>,
    commanded: Option<PointValue>,
    poll_state: PollState,
    last_error: Option<String>,
    readback_at_ms: Option<i64>,
}

struct PointSlot {
    point: Point,
    state: RwLock<PointState>,
    /// 同一点位的设备收发互斥（tokio Mutex 为 FIFO）
    exchange: tokio::sync::Mutex<()>,
}

impl PointSlot {
    fn new(point: Point) -> Self {
        Self {
            point,
            state: RwLock::new(PointState {
                readback: None,
                commanded: None,
                poll_state: PollState::Unpolled,
                last_error: None,
                readback_at_ms: None,
            }),
            exchange: tokio::sync::Mutex::new(()),
        }
    }

    fn snapshot(&self) -> PointSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        PointSnapshot {
            point: self.point.clone(),
            readback: state.readback,
            commanded: state.commanded,
            poll_state: state.poll_state,
            last_error: state.last_error.clone(),
            readback_at_ms: state.readback_at_ms,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut PointState)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
    }
}

struct Inner {
    transport: Arc<dyn DeviceTransport>,
    telemetry: Arc<Telemetry>,
}

impl Inner {
    async fn poll_slot(&self, slot: &PointSlot) -> Result<PointValue, SchedulerError> {
        let point = &slot.point;
        let result = {
            let _guard = slot.exchange.lock().await;
            self.read_point(point).await
        };
        match result {
            Ok(value) => {
                slot.update(|state| {
                    state.readback = Some(value);
                    state.poll_state = PollState::Polled;
                    state.last_error = None;
                    state.readback_at_ms = Some(now_epoch_ms());
                });
                self.telemetry.record_poll_success();
                debug!(target: "phd.scheduler", point = %point.name, value = %value, "readback updated");
                Ok(value)
            }
            Err(err) => {
                slot.update(|state| state.last_error = Some(err.to_string()));
                self.telemetry.record_poll_failure();
                warn!(
                    target: "phd.scheduler",
                    point = %point.name,
                    error = %err,
                    retryable = err.is_retryable(),
                    "poll failed, keeping previous readback"
                );
                Err(SchedulerError::Device(err))
            }
        }
    }

    async fn read_point(&self, point: &Point) -> Result<PointValue, ProtocolError> {
        let response = self.transport.read().await?;
        let parsed = parse_read_response(&response)?;
        if let Some(status) = &parsed.status {
            debug!(target: "phd.scheduler", point = %point.name, status = %status, "device status line");
        }
        let raw = parsed.field(point.field, &point.strip)?;
        Ok(match point.kind {
            PointKind::Boolean => PointValue::Bool(raw != 0.0),
            PointKind::Real => PointValue::Real(raw),
        })
    }
}

/// 点位调度器。
///
/// 必须在 tokio 运行时内使用；drop 时终止全部轮询任务。
pub struct PointScheduler {
    inner: Arc<Inner>,
    points: RwLock<BTreeMap<String, Arc<PointSlot>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PointScheduler {
    pub fn new(transport: Arc<dyn DeviceTransport>, telemetry: Arc<Telemetry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                telemetry,
            }),
            points: RwLock::new(BTreeMap::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// 注册点位并启动其周期轮询任务（首次轮询立即进行）。
    pub fn register_point(&self, point: Point) -> Result<(), SchedulerError> {
        point
            .validate()
            .map_err(|err| SchedulerError::Validation(err.to_string()))?;
        let slot = {
            let mut points = self.points.write().unwrap_or_else(PoisonError::into_inner);
            if points.contains_key(&point.name) {
                return Err(SchedulerError::DuplicatePoint(point.name));
            }
            let slot = Arc::new(PointSlot::new(point));
            points.insert(slot.point.name.clone(), slot.clone());
            slot
        };

        info!(
            target: "phd.scheduler",
            point = %slot.point.name,
            bus = %slot.point.bus,
            index = slot.point.index,
            period_ms = slot.point.poll_period.as_millis() as u64,
            "point registered"
        );
        let handle = tokio::spawn(poll_loop(self.inner.clone(), slot));
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(())
    }

    /// 执行一次轮询。失败时读回值保持不变。
    pub async fn poll(&self, name: &str) -> Result<PointValue, SchedulerError> {
        let slot = self.slot(name)?;
        self.inner.poll_slot(&slot).await
    }

    /// 下发写入并等待应答，成功后更新下发值。
    ///
    /// 设备未应答 `OK` 时返回 [`SchedulerError::Validation`]，下发值不变。
    /// 同一点位的并发写入不保证顺序，需要顺序时由调用方串行。
    pub async fn write(&self, name: &str, value: WriteValue) -> Result<PointValue, SchedulerError> {
        let slot = self.slot(name)?;
        let point = &slot.point;
        let commanded = coerce_write(point, &value).map_err(|err| match err {
            ProtocolError::Validation(err) => SchedulerError::Validation(err.to_string()),
            other => SchedulerError::Device(other),
        })?;
        let frame = encode_write(&point.bus, point.index, commanded);

        let response = {
            let _guard = slot.exchange.lock().await;
            self.inner.transport.write(&frame).await
        };
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.inner.telemetry.record_write_failure();
                warn!(target: "phd.scheduler", point = %point.name, error = %err, "write failed");
                return Err(SchedulerError::Device(err));
            }
        };
        if let Err(err) = decode_write_ack(&response) {
            self.inner.telemetry.record_write_rejected();
            warn!(target: "phd.scheduler", point = %point.name, error = %err, "write rejected by device");
            return Err(SchedulerError::Validation(format!(
                "device rejected write to {}: {}",
                point.name, err
            )));
        }

        slot.update(|state| state.commanded = Some(commanded));
        self.inner.telemetry.record_write_success();
        info!(target: "phd.scheduler", point = %point.name, value = %commanded, "write acknowledged");
        Ok(commanded)
    }

    /// 最近一次成功轮询得到的读回值。
    pub fn readback(&self, name: &str) -> Result<Option<PointValue>, SchedulerError> {
        Ok(self.snapshot(name)?.readback)
    }

    /// 最近一次被设备确认的下发值。
    pub fn commanded(&self, name: &str) -> Result<Option<PointValue>, SchedulerError> {
        Ok(self.snapshot(name)?.commanded)
    }

    pub fn poll_state(&self, name: &str) -> Result<PollState, SchedulerError> {
        Ok(self.snapshot(name)?.poll_state)
    }

    pub fn snapshot(&self, name: &str) -> Result<PointSnapshot, SchedulerError> {
        Ok(self.slot(name)?.snapshot())
    }

    /// 全部点位快照（按名称排序）。
    pub fn points(&self) -> Vec<PointSnapshot> {
        self.points
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|slot| slot.snapshot())
            .collect()
    }

    /// 终止全部轮询任务。
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in tasks.drain(..) {
            handle.abort();
        }
    }

    fn slot(&self, name: &str) -> Result<Arc<PointSlot>, SchedulerError> {
        self.points
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownPoint(name.to_string()))
    }
}

impl Drop for PointScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_loop(inner: Arc<Inner>, slot: Arc<PointSlot>) {
    let mut ticker = interval(slot.point.poll_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        // 失败已在 poll_slot 中记录
        let _ = inner.poll_slot(&slot).await;
    }
}

fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
