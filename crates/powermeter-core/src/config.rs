//! 애플리케이션 설정 구조체.
//!
//! 메시지 브로커 연결, 메트릭 만료 정책, 스크레이프 엔드포인트, 시계열 DB 푸시 설정을 정의한다.
//! 실제 로드(파일/환경변수 레이어링)는 [`crate::config_loader`] 담당.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 메시지 브로커 설정
    #[serde(default)]
    pub mqtt: MqttConfig,
    /// 메트릭 만료 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 스크레이프 엔드포인트 설정
    #[serde(default)]
    pub web: WebConfig,
    /// 시계열 DB 푸시 설정
    #[serde(default)]
    pub influx: InfluxConfig,
}

// ============================================================
// 메시지 브로커 설정
// ============================================================

/// MQTT 브로커 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// 브로커 URL (`mqtt://host[:port]`, `tcp://host[:port]`)
    #[serde(default = "default_mqtt_server")]
    pub server: String,
    /// 사용자 이름
    #[serde(default)]
    pub user: Option<String>,
    /// 비밀번호
    #[serde(default)]
    pub password: Option<String>,
    /// 브로커에 보고할 클라이언트 ID
    #[serde(default = "default_mqtt_client_id")]
    pub client_id: String,
    /// 구독 토픽 필터
    #[serde(default = "default_mqtt_topics")]
    pub topics: Vec<String>,
    /// keep-alive 주기 (초)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// 재연결 최대 대기 (초)
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
}

fn default_mqtt_server() -> String {
    "mqtt://localhost".to_string()
}
fn default_mqtt_client_id() -> String {
    "powermeter-exporter".to_string()
}
fn default_mqtt_topics() -> Vec<String> {
    vec!["powermeter/+/+".to_string(), "powermeter/+/+/+".to_string()]
}
fn default_keep_alive_secs() -> u64 {
    30
}
fn default_reconnect_max_secs() -> u64 {
    30
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            server: default_mqtt_server(),
            user: None,
            password: None,
            client_id: default_mqtt_client_id(),
            topics: default_mqtt_topics(),
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_max_secs: default_reconnect_max_secs(),
        }
    }
}

impl MqttConfig {
    /// keep-alive 주기
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// 재연결 최대 대기
    pub fn reconnect_max(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_secs)
    }
}

// ============================================================
// 메트릭 만료 설정
// ============================================================

/// 메트릭 만료 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// 이 시간 동안 소식이 없는 클라이언트를 제거 (초)
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// 만료 스윕 주기 (초)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_age_secs() -> u64 {
    300
}
fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl MetricsConfig {
    /// 최대 무응답 허용 시간
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// 스윕 주기
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ============================================================
// 스크레이프 엔드포인트 설정
// ============================================================

/// HTTP 스크레이프 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// 엔드포인트 활성화 여부
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    /// 포트 번호
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 외부 접근 허용 (false면 127.0.0.1에만 바인딩)
    #[serde(default = "default_allow_external")]
    pub allow_external: bool,
}

fn default_web_enabled() -> bool {
    true
}
fn default_web_port() -> u16 {
    3000
}
fn default_allow_external() -> bool {
    true
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            port: default_web_port(),
            allow_external: default_allow_external(),
        }
    }
}

// ============================================================
// 시계열 DB 푸시 설정
// ============================================================

/// InfluxDB(1.x 쓰기 API) 푸시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// 푸시 경로 활성화 여부
    #[serde(default)]
    pub enabled: bool,
    /// 서버 URL
    #[serde(default = "default_influx_server")]
    pub server: String,
    /// 사용자 이름
    #[serde(default)]
    pub user: String,
    /// 비밀번호
    #[serde(default)]
    pub password: String,
    /// 데이터베이스 이름
    #[serde(default = "default_influx_database")]
    pub database: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_influx_server() -> String {
    "http://localhost:8086".to_string()
}
fn default_influx_database() -> String {
    "powermeter".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: default_influx_server(),
            user: String::new(),
            password: String::new(),
            database: default_influx_database(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl InfluxConfig {
    /// 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ============================================================
// 기본값 / 검증
// ============================================================

impl AppConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            metrics: MetricsConfig::default(),
            web: WebConfig::default(),
            influx: InfluxConfig::default(),
        }
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.metrics.max_age_secs == 0 {
            return Err(CoreError::Config(
                "metrics.max_age_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.metrics.sweep_interval_secs == 0 {
            return Err(CoreError::Config(
                "metrics.sweep_interval_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.mqtt.topics.is_empty() {
            return Err(CoreError::Config("mqtt.topics가 비어 있습니다".to_string()));
        }

        let broker = Url::parse(&self.mqtt.server)
            .map_err(|e| CoreError::Config(format!("잘못된 브로커 URL {}: {e}", self.mqtt.server)))?;
        if !matches!(broker.scheme(), "mqtt" | "tcp") {
            return Err(CoreError::Config(format!(
                "지원하지 않는 브로커 스킴: {}",
                broker.scheme()
            )));
        }
        if broker.host_str().map_or(true, str::is_empty) {
            return Err(CoreError::Config(format!(
                "브로커 호스트 없음: {}",
                self.mqtt.server
            )));
        }

        if self.influx.enabled {
            Url::parse(&self.influx.server).map_err(|e| {
                CoreError::Config(format!("잘못된 InfluxDB URL {}: {e}", self.influx.server))
            })?;
            if self.influx.database.is_empty() {
                return Err(CoreError::Config(
                    "influx.database가 비어 있습니다".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_match_legacy_behavior() {
        let config = AppConfig::default_config();
        assert_eq!(config.mqtt.server, "mqtt://localhost");
        assert_eq!(config.mqtt.topics.len(), 2);
        assert_eq!(config.metrics.max_age(), Duration::from_secs(300));
        assert_eq!(config.metrics.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.web.port, 3000);
        assert!(config.web.enabled);
        assert!(!config.influx.enabled);
        assert_eq!(config.influx.database, "powermeter");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"metrics":{"max_age_secs":10}}"#).unwrap();
        assert_eq!(config.metrics.max_age_secs, 10);
        assert_eq!(config.metrics.sweep_interval_secs, 60);
        assert_eq!(config.mqtt.client_id, "powermeter-exporter");
    }

    #[test]
    fn zero_max_age_rejected() {
        let mut config = AppConfig::default_config();
        config.metrics.max_age_secs = 0;
        assert_matches!(config.validate(), Err(CoreError::Config(_)));
    }

    #[test]
    fn zero_sweep_interval_rejected() {
        let mut config = AppConfig::default_config();
        config.metrics.sweep_interval_secs = 0;
        assert_matches!(config.validate(), Err(CoreError::Config(_)));
    }

    #[test]
    fn broker_url_validation() {
        let mut config = AppConfig::default_config();
        config.mqtt.server = "tcp://broker.local:1884".to_string();
        assert!(config.validate().is_ok());

        config.mqtt.server = "http://broker.local".to_string();
        assert_matches!(config.validate(), Err(CoreError::Config(_)));

        config.mqtt.server = "not a url".to_string();
        assert_matches!(config.validate(), Err(CoreError::Config(_)));
    }

    #[test]
    fn influx_url_checked_only_when_enabled() {
        let mut config = AppConfig::default_config();
        config.influx.server = "::bad::".to_string();
        assert!(config.validate().is_ok());

        config.influx.enabled = true;
        assert_matches!(config.validate(), Err(CoreError::Config(_)));
    }
}
