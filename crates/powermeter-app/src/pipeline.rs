//! 수집 파이프라인.
//!
//! 버스 메시지를 도착 순서대로 하나씩 라우터에 적용하고,
//! 갱신된 값은 푸시 싱크로 비동기 전송한다 (결과를 기다리지 않음).

use chrono::Utc;
use powermeter_core::ingest::{IngestOutcome, IngestRouter};
use powermeter_core::ports::bus::BusMessage;
use powermeter_core::ports::sink::MetricSink;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// 수집 파이프라인
pub struct IngestPipeline {
    router: IngestRouter,
    sink: Option<Arc<dyn MetricSink>>,
}

impl IngestPipeline {
    /// 새 파이프라인 생성 (`sink`가 없으면 푸시 경로 비활성)
    pub fn new(router: IngestRouter, sink: Option<Arc<dyn MetricSink>>) -> Self {
        Self { router, sink }
    }

    /// 메시지 하나 처리
    ///
    /// 저장소 갱신은 즉시 끝나고, 싱크 전송은 별도 태스크에서 진행된다.
    pub fn process(&self, message: BusMessage) -> IngestOutcome {
        let outcome = self
            .router
            .handle(&message.topic, &message.payload, Utc::now());

        if let Some(sink) = &self.sink {
            let updates = outcome.updates().to_vec();
            if !updates.is_empty() {
                let sink = sink.clone();
                let topic = message.topic;
                tokio::spawn(async move {
                    if let Err(e) = sink.write(&updates).await {
                        warn!("메트릭 푸시 실패 ({topic}): {e}");
                    }
                });
            }
        }

        outcome
    }

    /// 채널이 닫히거나 종료 신호가 올 때까지 실행
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<BusMessage>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(
            "수집 파이프라인 시작 (푸시 경로: {})",
            if self.sink.is_some() { "활성" } else { "비활성" }
        );

        loop {
            tokio::select! {
                message = rx.recv() => {
                    match message {
                        Some(message) => {
                            debug!("메시지 수신: {}", message.topic);
                            self.process(message);
                        }
                        None => {
                            info!("버스 채널 닫힘, 수집 파이프라인 종료");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("수집 파이프라인 종료");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use powermeter_core::error::CoreError;
    use powermeter_core::models::metric::{MetricKind, MetricUpdate};
    use powermeter_core::store::MetricStore;
    use std::time::Duration;

    /// 기록만 하는 테스트용 싱크
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<MetricUpdate>>>,
        fail: bool,
    }

    #[async_trait]
    impl MetricSink for RecordingSink {
        async fn write(&self, updates: &[MetricUpdate]) -> Result<(), CoreError> {
            self.batches.lock().push(updates.to_vec());
            if self.fail {
                Err(CoreError::ServiceUnavailable("down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn pipeline(sink: Option<Arc<RecordingSink>>) -> (IngestPipeline, Arc<MetricStore>) {
        let store = Arc::new(MetricStore::new());
        let router = IngestRouter::new(store.clone());
        let sink = sink.map(|s| s as Arc<dyn MetricSink>);
        (IngestPipeline::new(router, sink), store)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn counter_is_pushed_as_one_batch() {
        let sink = Arc::new(RecordingSink::default());
        let (pipeline, store) = pipeline(Some(sink.clone()));

        pipeline.process(BusMessage::new("powermeter/A/watthours_total", "100"));
        settle().await;

        assert!(store.get("A").is_some());
        let batches = sink.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].kind, MetricKind::WattHoursTotal);
    }

    #[tokio::test]
    async fn lifecycle_messages_are_not_pushed() {
        let sink = Arc::new(RecordingSink::default());
        let (pipeline, _store) = pipeline(Some(sink.clone()));

        pipeline.process(BusMessage::new("powermeter/A/up", "hello"));
        pipeline.process(BusMessage::new("powermeter/A/dead", "bye"));
        pipeline.process(BusMessage::new("powermeter/A/voltage", "230"));
        settle().await;

        assert!(sink.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn sink_failure_does_not_affect_store() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let (pipeline, store) = pipeline(Some(sink.clone()));

        let outcome = pipeline.process(BusMessage::new("powermeter/A/watts", "120"));
        settle().await;

        assert_matches!(outcome, IngestOutcome::Updated(_));
        assert_eq!(store.get("A").unwrap().rate().unwrap().watts, 120.0);
        assert_eq!(sink.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn run_applies_in_order_until_channel_closes() {
        let (pipeline, store) = pipeline(None);
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        for value in ["100", "150", "200"] {
            tx.send(BusMessage::new("powermeter/A/watthours_total", value))
                .await
                .unwrap();
        }
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), pipeline.run(rx, shutdown_rx))
            .await
            .unwrap();

        let metric = store.get("A").unwrap();
        assert_eq!(metric.counter().unwrap().value, 200.0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (pipeline, _store) = pipeline(None);
        let (_tx, rx) = mpsc::channel::<BusMessage>(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), pipeline.run(rx, shutdown_rx))
            .await
            .unwrap();
    }
}
