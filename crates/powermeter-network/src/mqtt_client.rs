//! MQTT 메시지 버스 클라이언트.
//!
//! `MessageBus` 포트 구현. 자동 재연결 + exponential backoff.
//! 세션이 유지되지 않으므로 ConnAck마다 토픽을 다시 구독한다.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use powermeter_core::config::MqttConfig;
use powermeter_core::error::CoreError;
use powermeter_core::ports::bus::{BusMessage, MessageBus};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

/// MQTT 기본 포트
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// 요청 채널 용량 (구독 요청 등)
const REQUEST_CHANNEL_CAPACITY: usize = 32;

/// 브로커 연결 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// 자격증명 (사용자, 비밀번호)
    pub credentials: Option<(String, String)>,
}

impl BrokerAddress {
    /// 설정에서 브로커 주소 해석
    ///
    /// 설정의 사용자/비밀번호가 URL userinfo보다 우선한다.
    pub fn from_config(config: &MqttConfig) -> Result<Self, CoreError> {
        let url = Url::parse(&config.server)
            .map_err(|e| CoreError::Config(format!("잘못된 브로커 URL {}: {e}", config.server)))?;

        if !matches!(url.scheme(), "mqtt" | "tcp") {
            return Err(CoreError::Config(format!(
                "지원하지 않는 브로커 스킴: {}",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CoreError::Config(format!("브로커 호스트 없음: {}", config.server)))?
            .to_string();
        let port = url.port().unwrap_or(DEFAULT_MQTT_PORT);

        let user = match config.user.clone() {
            Some(user) => Some(user),
            None if !url.username().is_empty() => Some(decode_userinfo(url.username())?),
            None => None,
        };
        let password = match (config.password.clone(), url.password()) {
            (Some(password), _) => password,
            (None, Some(encoded)) => decode_userinfo(encoded)?,
            (None, None) => String::new(),
        };

        Ok(Self {
            host,
            port,
            credentials: user.map(|u| (u, password)),
        })
    }
}

/// URL userinfo 퍼센트 디코딩
fn decode_userinfo(encoded: &str) -> Result<String, CoreError> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| CoreError::Config(format!("잘못된 브로커 자격증명 인코딩: {e}")))
}

/// MQTT 버스 (`MessageBus` 포트 구현)
pub struct MqttBus {
    address: BrokerAddress,
    client_id: String,
    topics: Vec<String>,
    keep_alive: Duration,
    max_retry_secs: u64,
}

impl MqttBus {
    /// 새 MQTT 버스 생성
    pub fn new(config: &MqttConfig) -> Result<Self, CoreError> {
        Ok(Self {
            address: BrokerAddress::from_config(config)?,
            client_id: config.client_id.clone(),
            topics: config.topics.clone(),
            keep_alive: config.keep_alive(),
            max_retry_secs: config.reconnect_max_secs.max(1),
        })
    }

    /// 브로커 주소
    pub fn address(&self) -> &BrokerAddress {
        &self.address
    }

    fn options(&self) -> MqttOptions {
        let mut options =
            MqttOptions::new(&self.client_id, &self.address.host, self.address.port);
        options.set_keep_alive(self.keep_alive);
        if let Some((user, password)) = &self.address.credentials {
            options.set_credentials(user, password);
        }
        options
    }

    /// 모든 토픽 구독 요청
    fn subscribe_all(&self, client: &AsyncClient) {
        for topic in &self.topics {
            match client.try_subscribe(topic, QoS::AtMostOnce) {
                Ok(()) => debug!("MQTT 구독 요청: {topic}"),
                Err(e) => warn!("MQTT 구독 요청 실패 ({topic}): {e}"),
            }
        }
    }
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn run(&self, tx: mpsc::Sender<BusMessage>) -> Result<(), CoreError> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CHANNEL_CAPACITY);
        info!(
            "MQTT 연결 시작: {}:{}",
            self.address.host, self.address.port
        );

        let mut retry_delay = 1u64;

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("MQTT 연결 수립됨");
                        // 연결 성공 시 재시도 지연 리셋
                        retry_delay = 1;
                        self.subscribe_all(&client);
                    } else {
                        warn!("MQTT 연결 거부: {:?}", ack.code);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = BusMessage::new(publish.topic, publish.payload.to_vec());
                    if tx.send(message).await.is_err() {
                        info!("MQTT 메시지 채널 닫힘, 연결 종료");
                        let _ = client.try_disconnect();
                        return Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    // 채널이 닫혔으면 종료
                    if tx.is_closed() {
                        return Ok(());
                    }

                    // exponential backoff 재연결 (다음 poll이 재연결 시도)
                    warn!("MQTT 연결 에러: {e}, 재연결 대기: {retry_delay}초");
                    tokio::time::sleep(Duration::from_secs(retry_delay)).await;
                    retry_delay = (retry_delay * 2).min(self.max_retry_secs);
                }
            }
        }
    }
}
