//! 전력계 도메인 모델.
//!
//! 메시지 버스에서 수신한 원시 값과 익스포터가 읽어가는 스냅샷 구조체를 정의한다.
//! 외부로 노출되는 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod message;
pub mod metric;
pub mod sample;
