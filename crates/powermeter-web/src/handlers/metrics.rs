//! 스크레이프 엔드포인트 핸들러.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::exposition::{render_exposition, CONTENT_TYPE};
use crate::AppState;

/// 현재 메트릭을 Prometheus 텍스트 형식으로 반환
///
/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    // 스냅샷 복사 후 락 밖에서 렌더링
    let snapshot = state.store.snapshot();
    let body = render_exposition(&snapshot);
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
