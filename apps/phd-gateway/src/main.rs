//! PhD I/O 网关：轮询设备点位并通过 HTTP 暴露读回值与写入。

mod cli;
mod handlers;
mod routes;
mod utils;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use clap::Parser;
use phd_config::{GatewayConfig, GatewaySettings};
use phd_protocol::{DeviceLink, LinkTimeouts};
use phd_scheduler::PointScheduler;
use phd_telemetry::{Telemetry, init_tracing, new_request_id};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info};

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<PointScheduler>,
    pub telemetry: Arc<Telemetry>,
    pub prefix: String,
    pub endpoint: String,
}

impl AppState {
    /// 去掉对外名称前缀，得到点位名。
    pub fn point_name<'a>(&self, name: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return name;
        }
        name.strip_prefix(self.prefix.as_str()).unwrap_or(name)
    }
}

// 点位轮询为协作式调度，使用单线程运行时
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 环境变量 + 命令行覆盖，任一字段非法即终止启动
    let overrides = cli::Cli::parse().into_settings();
    let config = GatewayConfig::from_settings(GatewaySettings::from_env()?.overridden_by(overrides))?;
    // 初始化结构化日志
    init_tracing();
    info!(
        target: "phd.gateway",
        endpoint = %config.endpoint,
        points = config.points.len(),
        "starting networked PhD gateway"
    );

    let telemetry = Arc::new(Telemetry::new());
    let link = DeviceLink::new(
        config.endpoint,
        LinkTimeouts {
            connect: config.connect_timeout,
            io: config.io_timeout,
        },
        telemetry.clone(),
    );
    let scheduler = Arc::new(PointScheduler::new(Arc::new(link), telemetry.clone()));
    for point in config.points.iter().cloned() {
        scheduler.register_point(point)?;
    }

    let state = AppState {
        scheduler: scheduler.clone(),
        telemetry,
        prefix: config.prefix.clone(),
        endpoint: config.endpoint.to_string(),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(target: "phd.gateway", addr = %config.http_addr, "point server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    info!(target: "phd.gateway", "gateway stopped");
    Ok(())
}

fn build_app(state: AppState) -> Router {
    routes::create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id
        .layer(middleware::from_fn(request_context))
}

async fn request_context(req: Request<Body>, next: Next) -> Response {
    let request_id = new_request_id();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // 无法监听信号时保持运行
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use domain::{DEFAULT_POLL_PERIOD, Point, PointKind};
    use http_body_util::BodyExt;
    use phd_protocol::{DeviceTransport, ProtocolError};
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// 读请求固定返回 `reading`，写请求返回 `write_reply`。
    struct FakeDevice {
        reading: String,
        write_reply: Result<String, ProtocolError>,
        writes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DeviceTransport for FakeDevice {
        async fn exchange(&self, frame: &[u8]) -> Result<String, ProtocolError> {
            let frame = String::from_utf8_lossy(frame).into_owned();
            if frame == "parameter\n" {
                return Ok(self.reading.clone());
            }
            self.writes.lock().unwrap().push(frame);
            self.write_reply.clone()
        }
    }

    fn app(write_reply: Result<String, ProtocolError>) -> (Router, Arc<FakeDevice>) {
        let device = Arc::new(FakeDevice {
            reading: "1 4.5\nOK".to_string(),
            write_reply,
            writes: Mutex::new(Vec::new()),
        });
        let telemetry = Arc::new(Telemetry::new());
        let scheduler = Arc::new(PointScheduler::new(device.clone(), telemetry.clone()));
        scheduler
            .register_point(
                Point::new("do0", PointKind::Boolean, "DO", 0, DEFAULT_POLL_PERIOD)
                    .unwrap()
                    .with_field(0, ""),
            )
            .unwrap();
        scheduler
            .register_point(
                Point::new("diameter", PointKind::Real, "AO", 0, DEFAULT_POLL_PERIOD).unwrap(),
            )
            .unwrap();
        let state = AppState {
            scheduler,
            telemetry,
            prefix: "Portenta:".to_string(),
            endpoint: "127.0.0.1:4011".to_string(),
        };
        (build_app(state), device)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        assert!(response.headers().contains_key("x-request-id"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn put(uri: &str, body: &str) -> Request<Body> {
        Request::put(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn readback_is_exposed_after_poll() {
        let (app, _device) = app(Ok("OK".to_string()));
        // 让注册时启动的首次轮询完成
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let (status, body) = send(
            app.clone(),
            Request::get("/points/Portenta:diameter").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pv"], "Portenta:diameter");
        assert_eq!(body["data"]["readback"], 4.5);
        assert_eq!(body["data"]["pollState"], "polled");

        let (status, body) = send(app, Request::get("/points").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn write_is_forwarded_and_acknowledged() {
        let (app, device) = app(Ok("OK".to_string()));
        let (status, body) = send(app, put("/points/do0", r#"{"value":"on"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["commanded"], true);
        assert_eq!(*device.writes.lock().unwrap(), vec!["SET DO 0 1\n".to_string()]);
    }

    #[tokio::test]
    async fn rejected_write_is_unprocessable() {
        let (app, _device) = app(Ok("ERR bad pin".to_string()));
        let (status, body) = send(app.clone(), put("/points/do0", r#"{"value":true}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "POINT.WRITE_REJECTED");

        let (_, body) = send(app, Request::get("/points/do0").body(Body::empty()).unwrap()).await;
        assert!(body["data"]["commanded"].is_null());
    }

    #[tokio::test]
    async fn device_failure_is_bad_gateway() {
        let (app, _device) = app(Err(ProtocolError::Connection("refused".to_string())));
        let (status, body) = send(app, put("/points/diameter", r#"{"value":3.5}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "DEVICE.UNAVAILABLE");
    }

    #[tokio::test]
    async fn unknown_point_is_not_found() {
        let (app, _device) = app(Ok("OK".to_string()));
        let (status, body) =
            send(app, Request::get("/points/do9").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "POINT.NOT_FOUND");
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let (app, _device) = app(Ok("OK".to_string()));
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["endpoint"], "127.0.0.1:4011");
        assert_eq!(body["data"]["points"], 2);
    }
}
