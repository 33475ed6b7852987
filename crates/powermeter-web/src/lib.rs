//! # powermeter-web
//!
//! 메트릭 스크레이프 엔드포인트.
//! Axum 기반, 메트릭 저장소 스냅샷만 읽는다.
//!
//! ## 라우트
//! - `GET /metrics`: Prometheus 텍스트 노출 형식
//! - `GET /health`: 상태 + 활성 클라이언트 수
//! - `GET /api/clients`, `GET /api/clients/{id}`: JSON 스냅샷

pub mod error;
pub mod exposition;
pub mod handlers;
pub mod routes;

use axum::Router;
use powermeter_core::config::WebConfig;
use powermeter_core::store::MetricStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 웹 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 메트릭 저장소 (읽기 전용 사용)
    pub store: Arc<MetricStore>,
}

/// 스크레이프 엔드포인트 서버
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    /// 새 웹 서버 생성
    pub fn new(store: Arc<MetricStore>, config: WebConfig) -> Self {
        Self {
            config,
            state: AppState { store },
        }
    }

    /// 라우터 구성
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::scrape_routes())
            .nest("/api", routes::api_routes())
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.state.clone())
    }

    /// 바인딩 주소
    pub fn bind_addr(&self) -> SocketAddr {
        let host = if self.config.allow_external {
            [0, 0, 0, 0]
        } else {
            [127, 0, 0, 1]
        };
        SocketAddr::from((host, self.config.port))
    }

    /// 서버 실행
    ///
    /// `shutdown_rx`에 `true`가 오면 진행 중인 요청을 마치고 종료한다.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let addr = self.bind_addr();
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_rx).await
    }

    /// 이미 바인딩된 리스너로 서버 실행
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let app = self.router();
        info!("메트릭 엔드포인트 시작: http://{}/metrics", listener.local_addr()?);

        // Graceful shutdown과 함께 서버 실행
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                loop {
                    if *shutdown_rx.borrow() {
                        info!("웹 서버 종료 신호 수신");
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        info!("메트릭 엔드포인트 종료");
        Ok(())
    }

    /// 서버 URL 반환
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.config.port)
    }
}
