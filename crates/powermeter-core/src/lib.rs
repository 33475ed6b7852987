//! # powermeter-core
//!
//! 전력계 도메인 모델, 메트릭 상태 머신, 포트(trait) 정의, 에러 타입.
//! I/O 없이 동작하며 모든 연산은 현재 시각(`now`)을 인자로 받는다.
//!
//! ## 구조
//!
//! - [`models`]: 메시지/샘플/스냅샷 구조체
//! - [`history`]: 클라이언트별 카운터 샘플 이력 (FIFO)
//! - [`rate`]: 누적 카운터 → 순간 전력 추정
//! - [`store`]: 클라이언트 메트릭 저장소 (단일 배타 락)
//! - [`ingest`]: 토픽/페이로드 → 저장소 라우팅
//! - [`ports`]: 메시지 버스, 메트릭 싱크 포트 (async_trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`], [`config_loader`]: 설정 구조체와 레이어링 로더

pub mod config;
pub mod config_loader;
pub mod error;
pub mod history;
pub mod ingest;
pub mod models;
pub mod ports;
pub mod rate;
pub mod store;

#[cfg(test)]
mod tests {
    use crate::ingest::IngestRouter;
    use crate::store::MetricStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    #[test]
    fn snapshot_serializes_for_api() {
        let store = Arc::new(MetricStore::new());
        let router = IngestRouter::new(store.clone());
        let t0 = Utc::now();
        router.handle("powermeter/meter1/watthours_total", b"10", t0);
        router.handle("powermeter/meter1/watthours_total", b"11", t0 + Duration::hours(1));
        router.handle("powermeter/meter1/watthours_total", b"13", t0 + Duration::hours(2));

        let json = serde_json::to_value(store.snapshot()).unwrap();
        let client = &json[0];
        assert_eq!(client["client_id"], "meter1");
        assert_eq!(client["channels"][0]["counter"]["value"], 13.0);
        assert_eq!(client["channels"][0]["rate"]["watts"], 2.0);
        assert_eq!(client["channels"][0]["rate"]["source"], "derived");
    }

    #[test]
    fn independent_store_instances() {
        let a = MetricStore::new();
        let b = MetricStore::new();
        a.record_counter("x", 1.0, Utc::now());
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
