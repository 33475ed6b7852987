//! 클라이언트 메트릭 스냅샷과 업데이트 모델.
//!
//! `MetricStore::snapshot()`이 반환하는 읽기 전용 뷰와,
//! 푸시 경로(시계열 DB)로 전달되는 개별 업데이트를 표현.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sample::{PowerRate, Sample};

/// 메트릭 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// 누적 에너지 (Wh)
    WattHoursTotal,
    /// 순간 전력 (W)
    Watts,
    /// 장치 온도 (°C)
    TemperatureC,
    /// 장치 가동 시간 (ms)
    UptimeMs,
}

impl MetricKind {
    /// 시계열 DB 측정(measurement) 이름
    pub fn measurement(self) -> &'static str {
        match self {
            MetricKind::WattHoursTotal => "watthours_total",
            MetricKind::Watts => "watts",
            MetricKind::TemperatureC => "temperature",
            MetricKind::UptimeMs => "uptime",
        }
    }

    /// 위상(phase) 태그를 갖는 에너지 계열인지
    pub fn is_energy(self) -> bool {
        matches!(self, MetricKind::WattHoursTotal | MetricKind::Watts)
    }
}

/// 클라이언트 단위 보조 게이지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceGauge {
    /// 장치 온도 (°C)
    Temperature,
    /// 장치 가동 시간 (ms)
    Uptime,
}

impl DeviceGauge {
    /// 대응하는 메트릭 종류
    pub fn kind(self) -> MetricKind {
        match self {
            DeviceGauge::Temperature => MetricKind::TemperatureC,
            DeviceGauge::Uptime => MetricKind::UptimeMs,
        }
    }
}

/// 수집 1건이 만든 개별 메트릭 업데이트 (푸시 경로용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricUpdate {
    /// 클라이언트 ID
    pub client_id: String,
    /// 위상 (None이면 이름 없는 기본 채널)
    pub phase: Option<String>,
    /// 메트릭 종류
    pub kind: MetricKind,
    /// 값
    pub value: f64,
    /// 관측 시각
    pub observed_at: DateTime<Utc>,
}

/// 위상 채널 하나의 현재 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetric {
    /// 위상 이름 (None이면 기본 채널)
    pub phase: Option<String>,
    /// 최신 누적 카운터 (Wh)
    pub counter: Option<Sample>,
    /// 최신 전력 (W), 워밍업 전에는 None
    pub rate: Option<PowerRate>,
}

/// 클라이언트 하나의 현재 값 (읽기 전용 스냅샷)
///
/// 내부 샘플 이력은 노출하지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMetric {
    /// 클라이언트 ID
    pub client_id: String,
    /// 마지막 메시지 수신 시각 (만료 판정 기준)
    pub last_seen_at: DateTime<Utc>,
    /// 위상 채널 목록 (기본 채널 먼저, 이후 이름순)
    pub channels: Vec<ChannelMetric>,
    /// 장치 온도
    pub temperature: Option<Sample>,
    /// 장치 가동 시간
    pub uptime: Option<Sample>,
}

impl ClientMetric {
    /// 위상 채널 조회
    pub fn channel(&self, phase: Option<&str>) -> Option<&ChannelMetric> {
        self.channels.iter().find(|c| c.phase.as_deref() == phase)
    }

    /// 기본 채널의 누적 카운터
    pub fn counter(&self) -> Option<Sample> {
        self.channel(None).and_then(|c| c.counter)
    }

    /// 기본 채널의 전력
    pub fn rate(&self) -> Option<PowerRate> {
        self.channel(None).and_then(|c| c.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample::RateSource;

    #[test]
    fn measurement_names() {
        assert_eq!(MetricKind::WattHoursTotal.measurement(), "watthours_total");
        assert_eq!(MetricKind::Watts.measurement(), "watts");
        assert_eq!(MetricKind::TemperatureC.measurement(), "temperature");
        assert_eq!(MetricKind::UptimeMs.measurement(), "uptime");
        assert!(MetricKind::Watts.is_energy());
        assert!(!MetricKind::UptimeMs.is_energy());
    }

    #[test]
    fn channel_lookup() {
        let now = Utc::now();
        let metric = ClientMetric {
            client_id: "meter1".to_string(),
            last_seen_at: now,
            channels: vec![
                ChannelMetric {
                    phase: None,
                    counter: Some(Sample::new(10.0, now)),
                    rate: None,
                },
                ChannelMetric {
                    phase: Some("L1".to_string()),
                    counter: None,
                    rate: Some(PowerRate {
                        watts: 230.0,
                        observed_at: now,
                        source: RateSource::Reported,
                    }),
                },
            ],
            temperature: None,
            uptime: None,
        };

        assert_eq!(metric.counter().map(|s| s.value), Some(10.0));
        assert!(metric.rate().is_none());
        let l1 = metric.channel(Some("L1")).unwrap();
        assert_eq!(l1.rate.unwrap().watts, 230.0);
        assert!(metric.channel(Some("L2")).is_none());
    }

    #[test]
    fn snapshot_serializes_source_snake_case() {
        let now = Utc::now();
        let rate = PowerRate {
            watts: 1.5,
            observed_at: now,
            source: RateSource::Derived,
        };
        let json = serde_json::to_string(&rate).unwrap();
        assert!(json.contains("\"derived\""));
    }
}
