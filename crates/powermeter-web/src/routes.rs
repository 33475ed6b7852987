//! 라우트 정의.

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::AppState;

/// 스크레이프/헬스 라우트 (루트 경로)
pub fn scrape_routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(handlers::metrics::get_metrics))
        .route("/health", get(handlers::health::health))
}

/// JSON API 라우트 (`/api` 아래에 중첩)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(handlers::clients::list_clients))
        .route("/clients/{id}", get(handlers::clients::get_client))
}
