//! 路由定义

use super::AppState;
use super::handlers::*;
use axum::{Router, routing::get};

/// 创建点位暴露路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/points", get(list_points))
        .route("/points/:name", get(get_point).put(write_point))
}
