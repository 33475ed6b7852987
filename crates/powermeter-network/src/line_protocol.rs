//! InfluxDB 라인 프로토콜 인코딩.
//!
//! `measurement,tag=value,... field=value timestamp_ns`
//!
//! 측정 이름은 쉼표/공백, 태그 키·값은 쉼표/등호/공백을 역슬래시로 이스케이프한다.

use powermeter_core::models::metric::MetricUpdate;
use std::fmt::Write;

/// 위상이 없는 에너지 메트릭의 phase 태그 값
pub const MISSING_PHASE: &str = "missing";

/// 측정 이름 이스케이프
pub fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

/// 태그 키/값 이스케이프
pub fn escape_tag(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// 업데이트 하나를 라인 하나로 인코딩
///
/// 태그: `clientid`, 에너지 계열은 추가로 `phase` (없으면 `missing`).
pub fn encode_line(update: &MetricUpdate) -> String {
    let mut line = escape_measurement(update.kind.measurement());
    let _ = write!(line, ",clientid={}", escape_tag(&update.client_id));
    if update.kind.is_energy() {
        let phase = update.phase.as_deref().unwrap_or(MISSING_PHASE);
        let _ = write!(line, ",phase={}", escape_tag(phase));
    }
    let _ = write!(line, " value={}", update.value);
    if let Some(ns) = update.observed_at.timestamp_nanos_opt() {
        let _ = write!(line, " {ns}");
    }
    line
}

/// 여러 업데이트를 요청 본문 하나로 인코딩 (줄바꿈 구분)
pub fn encode_batch(updates: &[MetricUpdate]) -> String {
    updates
        .iter()
        .map(encode_line)
        .collect::<Vec<_>>()
        .join("\n")
}
