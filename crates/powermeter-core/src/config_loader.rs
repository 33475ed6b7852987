//! 설정 레이어링 로더.
//!
//! 우선순위 (낮음 → 높음):
//! 1. 기본값 ([`AppConfig::default_config`])
//! 2. 설정 파일 (`--config`, 확장자로 형식 판별: toml/json/yaml)
//! 3. `POWERMETER__<SECTION>__<KEY>` 환경변수
//! 4. 레거시 단일 환경변수 (`MQTT_SERVER`, `METRIC_MAX_AGE_SECONDS`, `INFLUX_*` 등)
//!
//! CLI 플래그 오버라이드는 바이너리에서 이 결과 위에 적용한다.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::CoreError;

/// 구조화 환경변수 접두어
pub const ENV_PREFIX: &str = "POWERMETER";

/// 레거시 환경변수 → 설정 키
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("MQTT_SERVER", "mqtt.server"),
    ("MQTT_USER", "mqtt.user"),
    ("MQTT_PASSWORD", "mqtt.password"),
    ("METRIC_MAX_AGE_SECONDS", "metrics.max_age_secs"),
    ("INFLUX_SERVER", "influx.server"),
    ("INFLUX_USER", "influx.user"),
    ("INFLUX_PASSWORD", "influx.password"),
    ("INFLUX_DATABASE", "influx.database"),
];

/// 프로세스 환경변수로 설정 로드
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CoreError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_config_with_env(path, &env)
}

/// 주어진 환경변수 맵으로 설정 로드
pub fn load_config_with_env(
    path: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<AppConfig, CoreError> {
    let defaults = Config::try_from(&AppConfig::default_config()).map_err(config_error)?;
    let mut builder = Config::builder().add_source(defaults);

    if let Some(path) = path {
        if !path.exists() {
            return Err(CoreError::Config(format!(
                "설정 파일 없음: {}",
                path.display()
            )));
        }
        debug!("설정 파일 로드: {}", path.display());
        builder = builder.add_source(File::from(path));
    }

    let structured: config::Map<String, String> = env
        .iter()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("mqtt.topics")
            .try_parsing(true)
            .source(Some(structured)),
    );

    for (var, key) in LEGACY_ENV_KEYS {
        let value = env.get(*var).filter(|v| !v.is_empty()).cloned();
        if value.is_some() {
            debug!("레거시 환경변수 적용: {var} → {key}");
        }
        builder = builder
            .set_override_option(*key, value)
            .map_err(config_error)?;
    }

    let config: AppConfig = builder
        .build()
        .map_err(config_error)?
        .try_deserialize()
        .map_err(config_error)?;
    config.validate()?;
    Ok(config)
}

fn config_error(e: config::ConfigError) -> CoreError {
    CoreError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_sources_gives_defaults() {
        let config = load_config_with_env(None, &HashMap::new()).unwrap();
        assert_eq!(config.mqtt.server, "mqtt://localhost");
        assert_eq!(config.metrics.max_age_secs, 300);
        assert_eq!(config.web.port, 3000);
        assert_eq!(
            config.mqtt.topics,
            vec!["powermeter/+/+".to_string(), "powermeter/+/+/+".to_string()]
        );
    }

    #[test]
    fn legacy_env_vars_apply() {
        let config = load_config_with_env(
            None,
            &env(&[
                ("MQTT_SERVER", "mqtt://broker:1884"),
                ("MQTT_USER", "meter"),
                ("METRIC_MAX_AGE_SECONDS", "600"),
                ("INFLUX_DATABASE", "energy"),
            ]),
        )
        .unwrap();
        assert_eq!(config.mqtt.server, "mqtt://broker:1884");
        assert_eq!(config.mqtt.user.as_deref(), Some("meter"));
        assert_eq!(config.mqtt.password, None);
        assert_eq!(config.metrics.max_age_secs, 600);
        assert_eq!(config.influx.database, "energy");
    }

    #[test]
    fn empty_legacy_value_is_ignored() {
        let config = load_config_with_env(None, &env(&[("MQTT_USER", "")])).unwrap();
        assert_eq!(config.mqtt.user, None);
    }

    #[test]
    fn structured_env_vars_apply() {
        let config = load_config_with_env(
            None,
            &env(&[
                ("POWERMETER__WEB__PORT", "9100"),
                ("POWERMETER__INFLUX__ENABLED", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(config.web.port, 9100);
        assert!(config.influx.enabled);
    }

    #[test]
    fn legacy_overrides_structured() {
        let config = load_config_with_env(
            None,
            &env(&[
                ("POWERMETER__METRICS__MAX_AGE_SECS", "10"),
                ("METRIC_MAX_AGE_SECONDS", "20"),
            ]),
        )
        .unwrap();
        assert_eq!(config.metrics.max_age_secs, 20);
    }

    #[test]
    fn file_layer_then_env() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[metrics]\nmax_age_secs = 120\n\n[web]\nport = 8080\nallow_external = false"
        )
        .unwrap();

        let config =
            load_config_with_env(Some(file.path()), &env(&[("POWERMETER__WEB__PORT", "8081")]))
                .unwrap();
        assert_eq!(config.metrics.max_age_secs, 120);
        assert_eq!(config.metrics.sweep_interval_secs, 60);
        assert_eq!(config.web.port, 8081);
        assert!(!config.web.allow_external);
    }

    #[test]
    fn missing_file_is_error() {
        let err = load_config_with_env(
            Some(Path::new("/nonexistent/powermeter.toml")),
            &HashMap::new(),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::Config(_));
    }

    #[test]
    fn invalid_values_rejected() {
        let err =
            load_config_with_env(None, &env(&[("METRIC_MAX_AGE_SECONDS", "0")])).unwrap_err();
        assert_matches!(err, CoreError::Config(_));

        let err = load_config_with_env(None, &env(&[("METRIC_MAX_AGE_SECONDS", "soon")]))
            .unwrap_err();
        assert_matches!(err, CoreError::Config(_));
    }
}
