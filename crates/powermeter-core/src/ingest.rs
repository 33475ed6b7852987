//! 수신 메시지 → 메트릭 저장소 라우팅.
//!
//! 전송 계층(MQTT 등)은 수신한 토픽/페이로드를 [`IngestRouter::handle`]로 넘기기만 한다.
//! 디코딩 실패나 알 수 없는 메시지 종류는 로그만 남기고 버린다.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::models::message::{MessageBody, PowerMessage};
use crate::models::metric::{DeviceGauge, MetricKind, MetricUpdate};
use crate::store::MetricStore;

/// 메시지 하나의 처리 결과
#[derive(Debug)]
pub enum IngestOutcome {
    /// 저장소 값이 갱신됨 (푸시 경로로 보낼 업데이트 목록, 비어 있을 수 있음)
    Updated(Vec<MetricUpdate>),
    /// 생존 신호 (`known`: 등록된 클라이언트였는지)
    Heartbeat { known: bool },
    /// 종료 알림으로 제거 (`existed`: 실제로 제거되었는지)
    Removed { existed: bool },
    /// 디코딩 실패로 버림
    Rejected(CoreError),
    /// 알 수 없는 메시지 종류
    Unknown { message_type: String },
}

impl IngestOutcome {
    /// 푸시 경로로 보낼 업데이트
    pub fn updates(&self) -> &[MetricUpdate] {
        match self {
            IngestOutcome::Updated(updates) => updates,
            _ => &[],
        }
    }
}

/// 수신 메시지 라우터
#[derive(Debug, Clone)]
pub struct IngestRouter {
    store: Arc<MetricStore>,
}

impl IngestRouter {
    /// 새 라우터 생성
    pub fn new(store: Arc<MetricStore>) -> Self {
        Self { store }
    }

    /// 주입된 저장소
    pub fn store(&self) -> &Arc<MetricStore> {
        &self.store
    }

    /// 원본 토픽/페이로드 처리
    pub fn handle(&self, topic: &str, payload: &[u8], now: DateTime<Utc>) -> IngestOutcome {
        match PowerMessage::parse(topic, payload) {
            Ok(message) => self.apply(message, now),
            Err(e) => {
                warn!("메시지 버림 ({topic}): {e}");
                IngestOutcome::Rejected(e)
            }
        }
    }

    /// 디코딩된 메시지 적용
    pub fn apply(&self, message: PowerMessage, now: DateTime<Utc>) -> IngestOutcome {
        let PowerMessage {
            client_id,
            phase,
            body,
        } = message;

        match body {
            MessageBody::WattHoursTotal(value) => {
                let update =
                    self.store
                        .record_phase_counter(&client_id, phase.as_deref(), value, now);
                let mut updates = vec![MetricUpdate {
                    client_id: client_id.clone(),
                    phase: phase.clone(),
                    kind: MetricKind::WattHoursTotal,
                    value: update.counter.value,
                    observed_at: update.counter.observed_at,
                }];
                if let Some(rate) = update.derived {
                    debug!("전력 계산: {client_id} {:.1} W", rate.watts);
                    updates.push(MetricUpdate {
                        client_id,
                        phase,
                        kind: MetricKind::Watts,
                        value: rate.watts,
                        observed_at: rate.observed_at,
                    });
                }
                IngestOutcome::Updated(updates)
            }
            MessageBody::Watts(watts) => {
                let rate = self
                    .store
                    .record_reported_rate(&client_id, phase.as_deref(), watts, now);
                IngestOutcome::Updated(vec![MetricUpdate {
                    client_id,
                    phase,
                    kind: MetricKind::Watts,
                    value: rate.watts,
                    observed_at: rate.observed_at,
                }])
            }
            MessageBody::TemperatureC(value) => {
                self.gauge(client_id, DeviceGauge::Temperature, value, now)
            }
            MessageBody::UptimeMs(value) => self.gauge(client_id, DeviceGauge::Uptime, value, now),
            MessageBody::Dead(reason) => {
                info!("클라이언트 종료: {client_id} ({reason})");
                let existed = self.store.remove(&client_id);
                IngestOutcome::Removed { existed }
            }
            MessageBody::Up(text) => {
                info!("클라이언트 접속: {client_id} ({text})");
                let known = self.store.record_heartbeat(&client_id, now);
                IngestOutcome::Heartbeat { known }
            }
            MessageBody::Unknown(message_type) => {
                warn!("알 수 없는 메시지 종류: {client_id}/{message_type}");
                IngestOutcome::Unknown { message_type }
            }
        }
    }

    fn gauge(
        &self,
        client_id: String,
        gauge: DeviceGauge,
        value: f64,
        now: DateTime<Utc>,
    ) -> IngestOutcome {
        let sample = self.store.record_gauge(&client_id, gauge, value, now);
        IngestOutcome::Updated(vec![MetricUpdate {
            client_id,
            phase: None,
            kind: gauge.kind(),
            value: sample.value,
            observed_at: sample.observed_at,
        }])
    }
}
