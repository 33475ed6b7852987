//! 포트 인터페이스 (trait).
//!
//! 어댑터 crate(`powermeter-network`)가 이 trait들을 구현하며,
//! `powermeter-app`에서 `Arc<dyn T>`로 와이어링한다.

pub mod bus;
pub mod sink;
