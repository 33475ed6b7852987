//! 누적 카운터에서 순간 전력 추정.
//!
//! 이력 버퍼가 가득 찼을 때만 값을 낸다 (워밍업 게이트).
//! 계산은 항상 최신 2개 샘플만 사용한다:
//! `watts = (newer.value - older.value) / ((newer.t - older.t) in hours)`

use crate::history::SampleHistory;

/// 1시간 (마이크로초)
pub const MICROS_PER_HOUR: f64 = 3_600_000_000.0;

/// 전력 추정기
#[derive(Debug, Clone, Copy, Default)]
pub struct RateEstimator;

impl RateEstimator {
    /// 새 추정기 생성
    pub fn new() -> Self {
        Self
    }

    /// 이력에서 전력(W) 추정
    ///
    /// 버퍼가 덜 찼거나 시간 간격이 0 이하이면 None.
    /// 카운터가 감소한 경우(장치 리셋)는 음수 전력을 그대로 낸다.
    pub fn estimate(&self, history: &SampleHistory) -> Option<f64> {
        if !history.is_full() {
            return None;
        }

        let mut newest_first = history.entries().rev();
        let newer = newest_first.next()?;
        let older = newest_first.next()?;

        // 마이크로초 오버플로(약 29만 년)는 추정 불가로 취급
        let elapsed_us = newer
            .observed_at
            .signed_duration_since(older.observed_at)
            .num_microseconds()?;
        if elapsed_us <= 0 {
            return None;
        }

        let hours = elapsed_us as f64 / MICROS_PER_HOUR;
        let watts = (newer.value - older.value) / hours;
        watts.is_finite().then_some(watts)
    }
}
