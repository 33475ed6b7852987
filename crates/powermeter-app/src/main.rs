//! # powermeter-app
//!
//! 전력계 익스포터 바이너리 진입점.
//! 설정 로드, DI 와이어링, 수집 파이프라인/만료 스윕/스크레이프 엔드포인트 오케스트레이션.

mod lifecycle;
mod pipeline;
mod scheduler;

use anyhow::{anyhow, Result};
use clap::Parser;
use powermeter_core::config::AppConfig;
use powermeter_core::config_loader::load_config;
use powermeter_core::ingest::IngestRouter;
use powermeter_core::ports::bus::{BusMessage, MessageBus};
use powermeter_core::ports::sink::MetricSink;
use powermeter_core::store::MetricStore;
use powermeter_network::influx_client::InfluxWriter;
use powermeter_network::mqtt_client::MqttBus;
use powermeter_web::WebServer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;
use crate::pipeline::IngestPipeline;
use crate::scheduler::{ExpirySweeper, SweepConfig};

/// 버스 → 파이프라인 채널 용량
const BUS_CHANNEL_CAPACITY: usize = 1024;

/// 종료 시 파이프라인 정리 대기 한도
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// ESP32 전력계 익스포터
///
/// MQTT로 수신한 누적 에너지 카운터에서 순간 전력을 계산해
/// Prometheus 스크레이프 엔드포인트와 InfluxDB로 내보낸다.
#[derive(Parser, Debug)]
#[command(name = "powermeter")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (toml/json/yaml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// MQTT 브로커 URL (예: mqtt://localhost:1883)
    #[arg(long)]
    mqtt_server: Option<String>,

    /// 스크레이프 엔드포인트 포트
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// 스크레이프 엔드포인트 비활성화
    #[arg(long)]
    no_web: bool,

    /// InfluxDB 푸시 활성화
    #[arg(long)]
    influx: bool,
}

/// CLI 인자로 설정 오버라이드 (가장 높은 우선순위)
fn apply_cli_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(ref server) = args.mqtt_server {
        config.mqtt.server = server.clone();
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if args.no_web {
        config.web.enabled = false;
    }
    if args.influx {
        config.influx.enabled = true;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing 초기화
    let log_filter = format!(
        "powermeter={},powermeter_app={},powermeter_core={},powermeter_network={},powermeter_web={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("전력계 익스포터 시작");

    // 설정 로드 + CLI 오버라이드
    let mut config =
        load_config(args.config.as_deref()).map_err(|e| anyhow!("설정 로드 실패: {e}"))?;
    apply_cli_overrides(&mut config, &args);
    config
        .validate()
        .map_err(|e| anyhow!("설정 검증 실패: {e}"))?;

    info!("MQTT 브로커: {}", config.mqtt.server);

    // 메트릭 저장소 (단일 인스턴스, 각 컴포넌트에 주입)
    let store = Arc::new(MetricStore::new());
    let lifecycle = Arc::new(LifecycleManager::new());

    // 푸시 경로
    let sink: Option<Arc<dyn MetricSink>> = if config.influx.enabled {
        let writer = InfluxWriter::new(&config.influx)?;
        info!("InfluxDB 푸시: {}", writer.write_url());
        Some(Arc::new(writer))
    } else {
        None
    };

    // ============================================================
    // 1. 메시지 버스 구독
    // ============================================================
    let bus: Arc<dyn MessageBus> = Arc::new(MqttBus::new(&config.mqtt)?);
    let (bus_tx, bus_rx) = mpsc::channel::<BusMessage>(BUS_CHANNEL_CAPACITY);
    let bus_task = tokio::spawn(async move {
        if let Err(e) = bus.run(bus_tx).await {
            error!("메시지 버스 오류: {e}");
        }
    });

    // ============================================================
    // 2. 수집 파이프라인
    // ============================================================
    let pipeline = IngestPipeline::new(IngestRouter::new(store.clone()), sink);
    let pipeline_shutdown_rx = lifecycle.subscribe();
    let pipeline_task = tokio::spawn(async move {
        pipeline.run(bus_rx, pipeline_shutdown_rx).await;
    });

    // ============================================================
    // 3. 만료 스윕
    // ============================================================
    let sweeper = ExpirySweeper::new(
        store.clone(),
        SweepConfig {
            max_age: config.metrics.max_age(),
            interval: config.metrics.sweep_interval(),
        },
    );
    let sweep_shutdown_rx = lifecycle.subscribe();
    let sweep_task = tokio::spawn(async move {
        sweeper.run(sweep_shutdown_rx).await;
    });

    // ============================================================
    // 4. 스크레이프 엔드포인트
    // ============================================================
    let web_task = if config.web.enabled {
        let web_server = WebServer::new(store.clone(), config.web.clone());
        let web_shutdown_rx = lifecycle.subscribe();
        info!("메트릭 엔드포인트: {}/metrics", web_server.url());
        Some(tokio::spawn(async move {
            if let Err(e) = web_server.run(web_shutdown_rx).await {
                error!("웹 서버 오류: {e}");
            }
        }))
    } else {
        info!("스크레이프 엔드포인트 비활성화");
        None
    };

    info!("전력계 익스포터 실행 중 (Ctrl+C로 종료)");

    // OS 시그널 대기
    if let Err(e) = lifecycle.wait_for_signal().await {
        error!("시그널 핸들러 등록 실패: {e}");
    }
    if !lifecycle.is_shutting_down() {
        lifecycle.shutdown();
    }

    // 정리
    bus_task.abort();
    for (name, task) in [
        ("수집 파이프라인", Some(pipeline_task)),
        ("만료 스윕", Some(sweep_task)),
        ("웹 서버", web_task),
    ] {
        let Some(task) = task else { continue };
        if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
            warn!("{name} 종료 대기 시간 초과");
        }
    }

    let dropped = store.shutdown();
    info!("전력계 익스포터 종료 (클라이언트 {dropped}개 폐기)");
    Ok(())
}
