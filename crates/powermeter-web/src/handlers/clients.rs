//! 클라이언트 스냅샷 JSON API 핸들러.

use axum::extract::{Path, State};
use axum::Json;
use powermeter_core::models::metric::ClientMetric;

use crate::error::ApiError;
use crate::AppState;

/// 전체 클라이언트 스냅샷 (클라이언트 ID 이름순)
///
/// GET /api/clients
pub async fn list_clients(State(state): State<AppState>) -> Json<Vec<ClientMetric>> {
    Json(state.store.snapshot())
}

/// 클라이언트 하나 조회
///
/// GET /api/clients/{id}
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<ClientMetric>, ApiError> {
    state
        .store
        .get(&client_id)
        .map(Json)
        .ok_or(ApiError::NotFound(client_id))
}
