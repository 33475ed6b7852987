//! 인메모리 메트릭 저장소.
//!
//! 클라이언트 ID → 현재 메트릭 값 + 위상별 샘플 이력.
//! 모든 연산은 단일 배타 락 아래에서 짧게 실행되며 I/O를 하지 않는다.
//!
//! 클라이언트 상태: 미등록 → 활성(메시지마다 `last_seen_at` 갱신) → 만료/제거.
//! 제거된 클라이언트가 다시 보고하면 빈 이력으로 새로 생성된다.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::history::{SampleHistory, SAMPLE_HISTORY_DEPTH};
use crate::models::metric::{ChannelMetric, ClientMetric, DeviceGauge};
use crate::models::sample::{PowerRate, RateSource, Sample};
use crate::rate::RateEstimator;

/// `record_counter` 결과
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterUpdate {
    /// 기록된 카운터
    pub counter: Sample,
    /// 이번에 새로 계산된 전력 (없으면 이전 값 유지)
    pub derived: Option<PowerRate>,
}

/// 위상 채널 내부 상태
#[derive(Debug)]
struct ChannelState {
    counter: Option<Sample>,
    rate: Option<PowerRate>,
    history: SampleHistory,
}

impl ChannelState {
    fn new(depth: usize) -> Self {
        Self {
            counter: None,
            rate: None,
            history: SampleHistory::new(depth),
        }
    }
}

/// 클라이언트 내부 상태
#[derive(Debug)]
struct ClientState {
    last_seen_at: DateTime<Utc>,
    channels: BTreeMap<Option<String>, ChannelState>,
    temperature: Option<Sample>,
    uptime: Option<Sample>,
}

impl ClientState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_seen_at: now,
            channels: BTreeMap::new(),
            temperature: None,
            uptime: None,
        }
    }

    fn channel_mut(&mut self, phase: Option<&str>, depth: usize) -> &mut ChannelState {
        self.channels
            .entry(phase.map(str::to_string))
            .or_insert_with(|| ChannelState::new(depth))
    }

    fn to_metric(&self, client_id: &str) -> ClientMetric {
        ClientMetric {
            client_id: client_id.to_string(),
            last_seen_at: self.last_seen_at,
            channels: self
                .channels
                .iter()
                .map(|(phase, ch)| ChannelMetric {
                    phase: phase.clone(),
                    counter: ch.counter,
                    rate: ch.rate,
                })
                .collect(),
            temperature: self.temperature,
            uptime: self.uptime,
        }
    }
}

/// 메트릭 저장소
///
/// `Arc<MetricStore>`로 수집기/익스포터/만료 스윕에 주입한다.
#[derive(Debug)]
pub struct MetricStore {
    clients: Mutex<HashMap<String, ClientState>>,
    history_depth: usize,
    estimator: RateEstimator,
}

impl MetricStore {
    /// 기본 이력 깊이(3)로 생성
    pub fn new() -> Self {
        Self::with_history_depth(SAMPLE_HISTORY_DEPTH)
    }

    /// 지정 이력 깊이로 생성
    pub fn with_history_depth(depth: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            history_depth: depth,
            estimator: RateEstimator::new(),
        }
    }

    /// 기본 채널 누적 카운터 기록
    pub fn record_counter(&self, client_id: &str, value: f64, now: DateTime<Utc>) -> CounterUpdate {
        self.record_phase_counter(client_id, None, value, now)
    }

    /// 위상 채널 누적 카운터 기록
    ///
    /// 카운터와 `last_seen_at`은 무조건 갱신. 새 전력 추정이 없으면 이전 전력을 유지한다.
    pub fn record_phase_counter(
        &self,
        client_id: &str,
        phase: Option<&str>,
        value: f64,
        now: DateTime<Utc>,
    ) -> CounterUpdate {
        let mut clients = self.clients.lock();
        let client = clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientState::new(now));
        client.last_seen_at = now;

        let channel = client.channel_mut(phase, self.history_depth);
        let counter = Sample::new(value, now);
        channel.counter = Some(counter);

        let mut derived = None;
        if channel.history.append(value, now) {
            if let Some(watts) = self.estimator.estimate(&channel.history) {
                let rate = PowerRate {
                    watts,
                    observed_at: now,
                    source: RateSource::Derived,
                };
                channel.rate = Some(rate);
                derived = Some(rate);
            }
        }

        CounterUpdate { counter, derived }
    }

    /// 장치가 직접 보고한 전력 기록
    ///
    /// 미분 경로보다 우선하며, 해당 채널의 이력을 비워 워밍업부터 다시 시작하게 한다.
    pub fn record_reported_rate(
        &self,
        client_id: &str,
        phase: Option<&str>,
        watts: f64,
        now: DateTime<Utc>,
    ) -> PowerRate {
        let mut clients = self.clients.lock();
        let client = clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientState::new(now));
        client.last_seen_at = now;

        let channel = client.channel_mut(phase, self.history_depth);
        channel.history.clear();
        let rate = PowerRate {
            watts,
            observed_at: now,
            source: RateSource::Reported,
        };
        channel.rate = Some(rate);
        rate
    }

    /// 장치 보조 게이지(온도/가동 시간) 기록
    pub fn record_gauge(
        &self,
        client_id: &str,
        gauge: DeviceGauge,
        value: f64,
        now: DateTime<Utc>,
    ) -> Sample {
        let mut clients = self.clients.lock();
        let client = clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientState::new(now));
        client.last_seen_at = now;

        let sample = Sample::new(value, now);
        match gauge {
            DeviceGauge::Temperature => client.temperature = Some(sample),
            DeviceGauge::Uptime => client.uptime = Some(sample),
        }
        sample
    }

    /// 생존 신호 기록 (`last_seen_at`만 갱신)
    ///
    /// 미등록 클라이언트면 아무것도 하지 않고 `false` 반환.
    pub fn record_heartbeat(&self, client_id: &str, now: DateTime<Utc>) -> bool {
        match self.clients.lock().get_mut(client_id) {
            Some(client) => {
                client.last_seen_at = now;
                true
            }
            None => false,
        }
    }

    /// 클라이언트 즉시 제거 (이력 포함)
    ///
    /// 존재했으면 `true`. 미등록 클라이언트 제거는 no-op.
    pub fn remove(&self, client_id: &str) -> bool {
        self.clients.lock().remove(client_id).is_some()
    }

    /// `last_seen_at`이 `max_age`보다 오래된 클라이언트 제거
    ///
    /// 제거된 클라이언트 ID 목록(이름순) 반환.
    pub fn expire(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<String> {
        let mut clients = self.clients.lock();
        let mut expired: Vec<String> = clients
            .iter()
            .filter(|(_, client)| {
                now.signed_duration_since(client.last_seen_at)
                    .to_std()
                    .is_ok_and(|age| age > max_age)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            clients.remove(id);
        }
        expired.sort();
        expired
    }

    /// 읽기 전용 스냅샷 (클라이언트 ID 이름순)
    pub fn snapshot(&self) -> Vec<ClientMetric> {
        let clients = self.clients.lock();
        let mut snapshot: Vec<ClientMetric> = clients
            .iter()
            .map(|(id, client)| client.to_metric(id))
            .collect();
        drop(clients);

        snapshot.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        snapshot
    }

    /// 클라이언트 하나 조회
    pub fn get(&self, client_id: &str) -> Option<ClientMetric> {
        self.clients
            .lock()
            .get(client_id)
            .map(|client| client.to_metric(client_id))
    }

    /// 활성 클라이언트 수
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// 비어있는지
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// 설정된 이력 깊이
    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    /// 종료 시 모든 클라이언트 상태 폐기
    ///
    /// 폐기된 클라이언트 수 반환. 이후에도 저장소는 계속 사용할 수 있다.
    pub fn shutdown(&self) -> usize {
        let mut clients = self.clients.lock();
        let count = clients.len();
        clients.clear();
        count
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}
