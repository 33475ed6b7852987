//! # powermeter-network
//!
//! 네트워크 어댑터.
//! MQTT 브로커 구독(`MessageBus` 포트)과 InfluxDB 1.x 쓰기 API 푸시(`MetricSink` 포트)를 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use powermeter_network::influx_client::InfluxWriter;
//! use powermeter_network::mqtt_client::MqttBus;
//!
//! let bus = MqttBus::new(&config.mqtt)?;
//! let sink = InfluxWriter::new(&config.influx)?;
//! ```

pub mod influx_client;
pub mod line_protocol;
pub mod mqtt_client;
