//! 헬스 체크 핸들러.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

/// 헬스 체크 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 상태 ("ok")
    pub status: &'static str,
    /// 활성 클라이언트 수
    pub clients: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        clients: state.store.len(),
    })
}
