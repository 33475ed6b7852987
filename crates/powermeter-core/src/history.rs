//! 클라이언트별 카운터 샘플 이력.
//!
//! 서로 다른 값을 가진 최근 샘플을 최대 `depth`개까지 보관하는 FIFO 버퍼.
//! 직전 값과 같은 값은 생존 신호(heartbeat)로 보고 추가하지 않는다.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::models::sample::Sample;

/// 기본 이력 깊이
///
/// 3개를 모두 채워야 전력을 계산하지만 계산에는 최신 2개만 사용한다.
/// 공백 직후 첫 차분으로 생기는 가짜 전력 스파이크를 막는 워밍업 게이트.
pub const SAMPLE_HISTORY_DEPTH: usize = 3;

/// 최소 이력 깊이 (차분에 2개 필요)
const MIN_DEPTH: usize = 2;

/// 카운터 샘플 이력 (FIFO, 인접 중복 없음)
#[derive(Debug, Clone)]
pub struct SampleHistory {
    entries: VecDeque<Sample>,
    depth: usize,
}

impl SampleHistory {
    /// 새 이력 생성 (`depth`는 최소 2로 보정)
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(MIN_DEPTH);
        Self {
            entries: VecDeque::with_capacity(depth + 1),
            depth,
        }
    }

    /// 샘플 추가
    ///
    /// 직전 값과 같으면 추가하지 않고 `false` 반환.
    pub fn append(&mut self, value: f64, now: DateTime<Utc>) -> bool {
        if self.entries.back().is_some_and(|last| last.value == value) {
            return false;
        }

        self.entries.push_back(Sample::new(value, now));
        if self.entries.len() > self.depth {
            self.entries.pop_front();
        }
        true
    }

    /// 보관 중인 샘플 (오래된 것부터)
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.entries.iter()
    }

    /// 최신 샘플
    pub fn latest(&self) -> Option<&Sample> {
        self.entries.back()
    }

    /// 보관 중인 샘플 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어있는지
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 최대 깊이
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 버퍼가 가득 찼는지 (워밍업 완료)
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.depth
    }

    /// 이력 비우기
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::new(SAMPLE_HISTORY_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn values(history: &SampleHistory) -> Vec<f64> {
        history.entries().map(|s| s.value).collect()
    }

    #[test]
    fn append_distinct_values() {
        let t0 = Utc::now();
        let mut history = SampleHistory::default();
        assert!(history.append(100.0, t0));
        assert!(history.append(150.0, t0 + Duration::seconds(10)));
        assert_eq!(values(&history), vec![100.0, 150.0]);
        assert!(!history.is_full());
    }

    #[test]
    fn duplicate_is_heartbeat() {
        let t0 = Utc::now();
        let mut history = SampleHistory::default();
        history.append(100.0, t0);
        assert!(!history.append(100.0, t0 + Duration::seconds(5)));
        assert_eq!(history.len(), 1);
        // 시각도 최초 관측값 유지
        assert_eq!(history.latest().unwrap().observed_at, t0);
    }

    #[test]
    fn non_adjacent_duplicates_are_kept() {
        let t0 = Utc::now();
        let mut history = SampleHistory::default();
        history.append(1.0, t0);
        history.append(2.0, t0 + Duration::seconds(1));
        assert!(history.append(1.0, t0 + Duration::seconds(2)));
        assert_eq!(values(&history), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn fifo_eviction() {
        let t0 = Utc::now();
        let mut history = SampleHistory::new(3);
        for (i, v) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            history.append(v, t0 + Duration::seconds(i as i64));
        }
        assert_eq!(history.len(), 3);
        assert!(history.is_full());
        assert_eq!(values(&history), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn depth_floor_is_two() {
        let history = SampleHistory::new(0);
        assert_eq!(history.depth(), 2);
    }

    #[test]
    fn clear_resets() {
        let mut history = SampleHistory::default();
        history.append(1.0, Utc::now());
        history.clear();
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }
}
