//! 메트릭 싱크 포트 (푸시 경로).
//!
//! 구현: `powermeter-network` crate (reqwest, InfluxDB 라인 프로토콜)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::metric::MetricUpdate;

/// 외부 시계열 저장소로 메트릭 전송
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// 메시지 하나에서 나온 업데이트들을 한 번에 기록
    ///
    /// 재시도하지 않는다. 실패는 호출자가 로그로 남긴다.
    async fn write(&self, updates: &[MetricUpdate]) -> Result<(), CoreError>;
}
