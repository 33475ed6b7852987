//! Prometheus 텍스트 노출 형식 (0.0.4) 렌더링.
//!
//! 모든 메트릭은 gauge. 레이블은 `client_id`, 이름 있는 위상 채널은 `phase` 추가.
//! 샘플마다 관측 시각(ms)을 타임스탬프로 붙인다.

use chrono::{DateTime, Utc};
use powermeter_core::models::metric::ClientMetric;
use std::fmt::Write;

/// 응답 Content-Type
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// 누적 에너지 gauge 이름
pub const WATTHOURS_TOTAL: &str = "esp32_powermeter_watthours_total";
/// 순간 전력 gauge 이름
pub const WATTS: &str = "esp32_powermeter_watts";
/// 장치 온도 gauge 이름
pub const TEMPERATURE: &str = "esp32_powermeter_temperature_celsius";
/// 장치 가동 시간 gauge 이름
pub const UPTIME: &str = "esp32_powermeter_uptime_milliseconds";

/// 노출 샘플 하나
struct Point<'a> {
    client_id: &'a str,
    phase: Option<&'a str>,
    value: f64,
    observed_at: DateTime<Utc>,
}

/// 레이블 값 이스케이프 (`\`, `"`, 줄바꿈)
pub fn escape_label_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

fn write_family(out: &mut String, name: &str, help: &str, points: &[Point<'_>]) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
    for point in points {
        let _ = write!(
            out,
            "{name}{{client_id=\"{}\"",
            escape_label_value(point.client_id)
        );
        if let Some(phase) = point.phase {
            let _ = write!(out, ",phase=\"{}\"", escape_label_value(phase));
        }
        let _ = writeln!(
            out,
            "}} {} {}",
            point.value,
            point.observed_at.timestamp_millis()
        );
    }
}

/// 스냅샷을 텍스트 노출 형식으로 렌더링
///
/// 입력 순서(클라이언트 ID 이름순, 채널은 기본 채널 먼저)를 그대로 따른다.
pub fn render_exposition(clients: &[ClientMetric]) -> String {
    let mut counters = Vec::new();
    let mut rates = Vec::new();
    let mut temperatures = Vec::new();
    let mut uptimes = Vec::new();

    for client in clients {
        for channel in &client.channels {
            let phase = channel.phase.as_deref();
            if let Some(counter) = channel.counter {
                counters.push(Point {
                    client_id: &client.client_id,
                    phase,
                    value: counter.value,
                    observed_at: counter.observed_at,
                });
            }
            if let Some(rate) = channel.rate {
                rates.push(Point {
                    client_id: &client.client_id,
                    phase,
                    value: rate.watts,
                    observed_at: rate.observed_at,
                });
            }
        }
        if let Some(sample) = client.temperature {
            temperatures.push(Point {
                client_id: &client.client_id,
                phase: None,
                value: sample.value,
                observed_at: sample.observed_at,
            });
        }
        if let Some(sample) = client.uptime {
            uptimes.push(Point {
                client_id: &client.client_id,
                phase: None,
                value: sample.value,
                observed_at: sample.observed_at,
            });
        }
    }

    let mut out = String::new();
    write_family(&mut out, WATTHOURS_TOTAL, "Total Energy counted in Wh", &counters);
    write_family(&mut out, WATTS, "Current Power in W", &rates);
    write_family(&mut out, TEMPERATURE, "Device temperature in °C", &temperatures);
    write_family(&mut out, UPTIME, "Device uptime in ms", &uptimes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use powermeter_core::store::MetricStore;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn empty_store_has_headers_only() {
        let text = render_exposition(&[]);
        assert!(text.contains("# TYPE esp32_powermeter_watthours_total gauge"));
        assert!(text.contains("# HELP esp32_powermeter_watts Current Power in W"));
        assert!(!text.contains("client_id"));
    }

    #[test]
    fn counter_and_rate_with_timestamps() {
        let store = MetricStore::new();
        store.record_counter("A", 100.0, at(0));
        store.record_counter("A", 150.0, at(10));
        store.record_counter("A", 200.0, at(20));

        let text = render_exposition(&store.snapshot());
        assert!(text.contains(
            "esp32_powermeter_watthours_total{client_id=\"A\"} 200 1700000020000\n"
        ));
        let watts_line = text
            .lines()
            .find(|l| l.starts_with("esp32_powermeter_watts{"))
            .unwrap();
        let value: f64 = watts_line.split(' ').nth(1).unwrap().parse().unwrap();
        assert!((value - 18_000.0).abs() < 1e-6);
        assert!(watts_line.ends_with(" 1700000020000"));
    }

    #[test]
    fn rate_absent_during_warm_up() {
        let store = MetricStore::new();
        store.record_counter("A", 100.0, at(0));
        store.record_counter("A", 150.0, at(10));

        let text = render_exposition(&store.snapshot());
        assert!(text.contains("esp32_powermeter_watthours_total{client_id=\"A\"} 150"));
        assert!(!text.contains("esp32_powermeter_watts{"));
    }

    #[test]
    fn phase_label_and_ordering() {
        let store = MetricStore::new();
        store.record_reported_rate("b", Some("L2"), 2.0, at(0));
        store.record_reported_rate("b", Some("L1"), 1.0, at(0));
        store.record_reported_rate("a", None, 3.0, at(0));

        let text = render_exposition(&store.snapshot());
        let lines: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("esp32_powermeter_watts{"))
            .collect();
        assert_eq!(
            lines,
            vec![
                "esp32_powermeter_watts{client_id=\"a\"} 3 1700000000000",
                "esp32_powermeter_watts{client_id=\"b\",phase=\"L1\"} 1 1700000000000",
                "esp32_powermeter_watts{client_id=\"b\",phase=\"L2\"} 2 1700000000000",
            ]
        );
    }

    #[test]
    fn device_gauges_rendered() {
        use powermeter_core::models::metric::DeviceGauge;

        let store = MetricStore::new();
        store.record_gauge("m", DeviceGauge::Temperature, 41.5, at(0));
        store.record_gauge("m", DeviceGauge::Uptime, 360000.0, at(1));

        let text = render_exposition(&store.snapshot());
        assert!(text.contains(
            "esp32_powermeter_temperature_celsius{client_id=\"m\"} 41.5 1700000000000"
        ));
        assert!(text.contains(
            "esp32_powermeter_uptime_milliseconds{client_id=\"m\"} 360000 1700000001000"
        ));
    }

    #[test]
    fn label_values_escaped() {
        assert_eq!(escape_label_value("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
