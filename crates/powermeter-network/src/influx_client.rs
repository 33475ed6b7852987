//! InfluxDB 1.x 쓰기 API 클라이언트.
//!
//! `MetricSink` 포트 구현. 메시지 하나의 업데이트를 POST 한 번으로 보낸다.
//! 재시도하지 않는다 (fire-and-forget, 실패는 호출자가 로그로 남김).

use async_trait::async_trait;
use powermeter_core::config::InfluxConfig;
use powermeter_core::error::CoreError;
use powermeter_core::models::metric::MetricUpdate;
use powermeter_core::ports::sink::MetricSink;
use tracing::debug;
use url::Url;

use crate::line_protocol::encode_batch;

/// InfluxDB 라인 프로토콜 writer (`MetricSink` 포트 구현)
#[derive(Debug)]
pub struct InfluxWriter {
    client: reqwest::Client,
    write_url: Url,
    user: String,
    password: String,
}

impl InfluxWriter {
    /// 새 writer 생성
    pub fn new(config: &InfluxConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        let base = config.server.trim_end_matches('/');
        let mut write_url = Url::parse(&format!("{base}/write"))
            .map_err(|e| CoreError::Config(format!("잘못된 InfluxDB URL {base}: {e}")))?;
        write_url
            .query_pairs_mut()
            .append_pair("db", &config.database);

        Ok(Self {
            client,
            write_url,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// 쓰기 엔드포인트 URL
    pub fn write_url(&self) -> &str {
        self.write_url.as_str()
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(resp: reqwest::Response) -> Result<(), CoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_else(|e| {
            tracing::warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status.as_u16() {
            401 => Err(CoreError::Auth(format!("InfluxDB 인증 실패: {text}"))),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::Internal(format!("InfluxDB 에러 ({status}): {text}"))),
        }
    }
}

#[async_trait]
impl MetricSink for InfluxWriter {
    async fn write(&self, updates: &[MetricUpdate]) -> Result<(), CoreError> {
        if updates.is_empty() {
            return Ok(());
        }

        let body = encode_batch(updates);
        debug!("InfluxDB 쓰기: {} 라인", updates.len());

        let mut request = self.client.post(self.write_url.clone()).body(body);
        if !self.user.is_empty() {
            request = request.basic_auth(&self.user, Some(&self.password));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("InfluxDB 요청 실패: {e}")))?;
        Self::check_response(resp).await
    }
}
