//! 관측 샘플 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 단일 관측값 (생성 후 불변)
///
/// 누적 카운터(Wh)와 보조 게이지(온도, 가동 시간)에 공통으로 사용한다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 관측값
    pub value: f64,
    /// 관측 시각
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    /// 새 샘플 생성
    pub fn new(value: f64, observed_at: DateTime<Utc>) -> Self {
        Self { value, observed_at }
    }
}

/// 전력값 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// 누적 Wh 카운터 미분으로 계산
    Derived,
    /// 장치가 `watts` 메시지로 직접 보고
    Reported,
}

/// 순간 전력 (W)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerRate {
    /// 전력 (W)
    pub watts: f64,
    /// 이 값이 유효한 시각 (미분값은 최신 샘플 시각)
    pub observed_at: DateTime<Utc>,
    /// 출처
    pub source: RateSource,
}
