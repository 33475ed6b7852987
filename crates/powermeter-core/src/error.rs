//! 전력계 핵심 에러 타입.
//!
//! 어댑터 crate는 자체 에러 타입에서 `#[from] CoreError`로 래핑한다.
//! 메트릭 저장소 연산은 에러를 반환하지 않는다. 디코딩, 설정 로드, I/O 어댑터만 사용한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 토픽 구조가 `powermeter/<clientId>/<messageType>[/<phase>]`와 다름
    #[error("잘못된 토픽: {0}")]
    InvalidTopic(String),

    /// 숫자를 기대한 페이로드가 숫자가 아님
    #[error("잘못된 페이로드 ({message_type}): {payload:?}")]
    MalformedPayload {
        /// 메시지 종류 (예: "watthours_total")
        message_type: String,
        /// 원본 페이로드 (UTF-8 손실 변환)
        payload: String,
    },

    /// 인증 실패 (브로커/데이터베이스 자격증명 오류)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}
