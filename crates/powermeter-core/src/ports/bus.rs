//! 메시지 버스 포트.
//!
//! 구현: `powermeter-network` crate (rumqttc)

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;

/// 버스에서 수신한 원본 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// 토픽
    pub topic: String,
    /// 페이로드 (디코딩 전 바이트)
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// 새 메시지 생성
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// 메시지 버스 구독자
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// 브로커 연결 및 메시지 수신
    ///
    /// 수신된 메시지를 `tx` 채널로 전송한다.
    /// 연결이 끊기면 자동 재연결하며, `tx` 수신측이 닫히면 반환한다.
    async fn run(&self, tx: mpsc::Sender<BusMessage>) -> Result<(), CoreError>;
}
