//! 만료 스윕 스케줄러.
//!
//! 메시지 도착과 무관하게 고정 주기로 오래된 클라이언트를 제거한다.

use chrono::{DateTime, Utc};
use powermeter_core::store::MetricStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// 만료 스윕 설정
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// 최대 무응답 허용 시간
    pub max_age: Duration,
    /// 스윕 주기
    pub interval: Duration,
}

/// 만료 스윕 루프
pub struct ExpirySweeper {
    store: Arc<MetricStore>,
    config: SweepConfig,
}

impl ExpirySweeper {
    /// 새 스윕 루프 생성
    pub fn new(store: Arc<MetricStore>, config: SweepConfig) -> Self {
        Self { store, config }
    }

    /// 스윕 1회 실행
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<String> {
        let expired = self.store.expire(now, self.config.max_age);
        for client_id in &expired {
            info!("클라이언트 만료: {client_id}");
        }
        debug!("만료 스윕 완료: 제거 {}, 남음 {}", expired.len(), self.store.len());
        expired
    }

    /// 종료 신호까지 주기 실행
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "만료 스윕 시작: 주기={}s, 최대 무응답={}s",
            self.config.interval.as_secs(),
            self.config.max_age.as_secs()
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 첫 tick은 즉시 완료되므로 건너뜀
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep(Utc::now());
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("만료 스윕 종료");
                        break;
                    }
                }
            }
        }
    }
}
