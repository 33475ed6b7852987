//! 메시지 버스 수신 메시지 모델.
//!
//! 토픽 구조: `powermeter/<clientId>/<messageType>[/<phase>]`
//! 페이로드: UTF-8 10진수 (단, `dead`/`up`은 자유 텍스트)

use crate::error::CoreError;

/// 토픽 접두어
pub const TOPIC_PREFIX: &str = "powermeter";

/// 디코딩된 메시지 본문
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// 누적 에너지 (Wh)
    WattHoursTotal(f64),
    /// 장치가 직접 보고한 전력 (W)
    Watts(f64),
    /// 장치 온도 (°C)
    TemperatureC(f64),
    /// 장치 가동 시간 (ms)
    UptimeMs(f64),
    /// 종료 알림 (last will 메시지)
    Dead(String),
    /// 접속 알림
    Up(String),
    /// 알 수 없는 메시지 종류
    Unknown(String),
}

impl MessageBody {
    /// 메시지 종류 문자열
    pub fn message_type(&self) -> &str {
        match self {
            MessageBody::WattHoursTotal(_) => "watthours_total",
            MessageBody::Watts(_) => "watts",
            MessageBody::TemperatureC(_) => "temperature_c",
            MessageBody::UptimeMs(_) => "uptime_ms",
            MessageBody::Dead(_) => "dead",
            MessageBody::Up(_) => "up",
            MessageBody::Unknown(t) => t,
        }
    }
}

/// 디코딩된 전력계 메시지
#[derive(Debug, Clone, PartialEq)]
pub struct PowerMessage {
    /// 클라이언트 ID (토픽 두 번째 세그먼트)
    pub client_id: String,
    /// 위상 (토픽 네 번째 세그먼트, 없거나 비어 있으면 None)
    pub phase: Option<String>,
    /// 본문
    pub body: MessageBody,
}

impl PowerMessage {
    /// 토픽과 페이로드를 디코딩
    ///
    /// 알 수 없는 메시지 종류는 에러가 아니라 `MessageBody::Unknown`으로 반환한다.
    pub fn parse(topic: &str, payload: &[u8]) -> Result<Self, CoreError> {
        let segments: Vec<&str> = topic.split('/').collect();
        if !(3..=4).contains(&segments.len()) || segments[0] != TOPIC_PREFIX {
            return Err(CoreError::InvalidTopic(topic.to_string()));
        }

        let client_id = segments[1];
        let message_type = segments[2];
        if client_id.is_empty() || message_type.is_empty() {
            return Err(CoreError::InvalidTopic(topic.to_string()));
        }

        let phase = segments
            .get(3)
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string());

        let text = String::from_utf8_lossy(payload);
        let body = match message_type {
            "watthours_total" => MessageBody::WattHoursTotal(parse_number(message_type, &text)?),
            "watts" => MessageBody::Watts(parse_number(message_type, &text)?),
            "temperature_c" => MessageBody::TemperatureC(parse_number(message_type, &text)?),
            "uptime_ms" => MessageBody::UptimeMs(parse_number(message_type, &text)?),
            "dead" => MessageBody::Dead(text.into_owned()),
            "up" => MessageBody::Up(text.into_owned()),
            other => MessageBody::Unknown(other.to_string()),
        };

        Ok(Self {
            client_id: client_id.to_string(),
            phase,
            body,
        })
    }
}

/// 10진수 페이로드 파싱 (정수/실수 모두 허용, NaN/무한대 거부)
fn parse_number(message_type: &str, text: &str) -> Result<f64, CoreError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoreError::MalformedPayload {
            message_type: message_type.to_string(),
            payload: text.to_string(),
        })
}
